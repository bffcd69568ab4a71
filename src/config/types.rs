//! Configuration type definitions.
//!
//! This module contains all the data structures used in folio configuration files.
//! These types are pure data - no I/O or complex logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Site configuration
// =============================================================================

/// Root site configuration, read once at startup and shared read-only by
/// every build stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display data exposed to templates as `site.*`
    #[serde(default)]
    pub site: SiteData,

    /// Directory holding the markdown sources
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory the rendered site is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding all themes
    #[serde(default = "default_themes_dir")]
    pub themes_dir: PathBuf,

    /// Name of the active theme (a subdirectory of `themes_dir`)
    #[serde(default = "default_theme")]
    pub theme: String,

    /// File extension of source documents
    #[serde(default = "default_content_extension")]
    pub content_extension: String,

    /// File extension of rendered documents
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Maximum excerpt length in characters
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    /// Extensions to load, in registration order
    #[serde(default)]
    pub extensions: Vec<ExtensionRef>,

    /// Per-extension settings, keyed by extension name
    #[serde(default)]
    pub extension_settings: BTreeMap<String, serde_yaml::Value>,

    /// Development-specific settings (serve, watch)
    #[serde(default)]
    pub dev: DevConfig,

    /// Directory relative paths are resolved against (the config file's directory)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteData::default(),
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            themes_dir: default_themes_dir(),
            theme: default_theme(),
            content_extension: default_content_extension(),
            output_extension: default_output_extension(),
            excerpt_length: default_excerpt_length(),
            extensions: Vec::new(),
            extension_settings: BTreeMap::new(),
            dev: DevConfig::default(),
            root: PathBuf::new(),
        }
    }
}

impl SiteConfig {
    /// Absolute path of the source directory.
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source_dir)
    }

    /// Absolute path of the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Absolute path of the active theme.
    pub fn theme_path(&self) -> PathBuf {
        self.resolve(&self.themes_dir).join(&self.theme)
    }

    /// Settings for a single extension, if any were configured.
    pub fn settings_for(&self, extension: &str) -> Option<&serde_yaml::Value> {
        self.extension_settings.get(extension)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.root.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_themes_dir() -> PathBuf {
    PathBuf::from("themes")
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_content_extension() -> String {
    "md".to_string()
}

fn default_output_extension() -> String {
    "html".to_string()
}

fn default_excerpt_length() -> usize {
    200
}

/// Site-wide display data, available to every template as `site`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteData {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Path prefix for every generated link (e.g. "/blog/")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Any other keys (e.g. `github`), flattened to `site.*`
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_title() -> String {
    "My Folio Site".to_string()
}

fn default_description() -> String {
    "A site built with folio".to_string()
}

fn default_base_url() -> String {
    "/".to_string()
}

impl Default for SiteData {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            base_url: default_base_url(),
            author: None,
            email: None,
            extra: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Extension references
// =============================================================================

/// An entry in the `extensions` list.
///
/// ```yaml
/// extensions:
///   - word-count              # resolved by name
///   - name: analytics         # inline declarative extension
///     snippet: "<script src='{src}'></script>"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionRef {
    /// Looked up through the extension loaders
    Named(String),
    /// A declarative extension given inline
    Inline(ExtensionSpec),
    /// Anything else; skipped with a diagnostic
    Invalid(serde_yaml::Value),
}

/// A declarative extension, written inline in the config or in its own YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExtensionSpec {
    /// Name the helper is registered under (defaults to the file stem for file-based extensions)
    #[serde(default)]
    pub name: Option<String>,
    /// Metadata inserted into every document that does not already set the key
    #[serde(default)]
    pub defaults: BTreeMap<String, serde_yaml::Value>,
    /// Markup returned by the helper; `{key}` placeholders are filled from
    /// helper arguments, then from the extension settings
    #[serde(default)]
    pub snippet: Option<String>,
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Port the development server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
    /// Enable live reload in the browser when files change (default: true)
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            watch: WatchConfig::default(),
            live_reload: true,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_live_reload() -> bool {
    true
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SiteConfig = serde_yaml::from_str("theme: minimal\n").unwrap();
        assert_eq!(config.theme, "minimal");
        assert_eq!(config.source_dir, PathBuf::from("source"));
        assert_eq!(config.site.base_url, "/");
        assert_eq!(config.excerpt_length, 200);
        assert_eq!(config.dev.port, 3000);
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let config = SiteConfig {
            root: PathBuf::from("/project"),
            ..SiteConfig::default()
        };
        assert_eq!(config.source_path(), PathBuf::from("/project/source"));
        assert_eq!(config.output_path(), PathBuf::from("/project/public"));
        assert_eq!(config.theme_path(), PathBuf::from("/project/themes/default"));
    }

    #[test]
    fn test_site_extra_keys_are_kept() {
        let yaml = "site:\n  title: Notes\n  github: https://github.com/someone\n";
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.site.title, "Notes");
        assert!(config.site.extra.contains_key("github"));
    }

    #[test]
    fn test_extension_refs() {
        let yaml = r#"
extensions:
  - word-count
  - name: analytics
    snippet: "<script></script>"
  - 42
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(&config.extensions[0], ExtensionRef::Named(n) if n == "word-count"));
        assert!(matches!(&config.extensions[1], ExtensionRef::Inline(spec) if spec.name.as_deref() == Some("analytics")));
        assert!(matches!(&config.extensions[2], ExtensionRef::Invalid(_)));
    }
}
