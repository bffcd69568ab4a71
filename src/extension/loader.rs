use std::path::{Path, PathBuf};

use super::declarative::declarative_extension;
use super::{Extension, ExtensionLoadError};
use crate::config::{ExtensionSpec, SiteConfig};

/// Resolves an extension name.
///
/// `Ok(None)` means "not mine" and lets the next loader try; an error means
/// the loader found the extension but could not use it.
pub trait ExtensionLoader: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn load(&self, name: &str, config: &SiteConfig)
    -> Result<Option<Extension>, ExtensionLoadError>;
}

/// Looks in a conventional directory for `<name>.yaml`, `<name>.yml` or
/// `<name>/extension.yaml`.
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, name: &str) -> [PathBuf; 3] {
        [
            self.dir.join(format!("{}.yaml", name)),
            self.dir.join(format!("{}.yml", name)),
            self.dir.join(name).join("extension.yaml"),
        ]
    }
}

impl ExtensionLoader for DirectoryLoader {
    fn name(&self) -> &str {
        "directory"
    }

    fn load(
        &self,
        name: &str,
        config: &SiteConfig,
    ) -> Result<Option<Extension>, ExtensionLoadError> {
        match self.candidates(name).into_iter().find(|p| p.is_file()) {
            Some(path) => load_file(&path, name, config).map(Some),
            None => Ok(None),
        }
    }
}

/// Treats the name as a path relative to the config directory: either a
/// YAML file or a directory holding `extension.yaml`.
pub struct PathLoader {
    root: PathBuf,
}

impl PathLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExtensionLoader for PathLoader {
    fn name(&self) -> &str {
        "path"
    }

    fn load(
        &self,
        name: &str,
        config: &SiteConfig,
    ) -> Result<Option<Extension>, ExtensionLoadError> {
        let path = self.root.join(name);
        let file = if path.is_dir() {
            path.join("extension.yaml")
        } else {
            path
        };
        if !file.is_file() {
            return Ok(None);
        }

        let fallback_name = file
            .parent()
            .filter(|_| file.ends_with("extension.yaml"))
            .and_then(|dir| dir.file_name())
            .or_else(|| file.file_stem())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());

        load_file(&file, &fallback_name, config).map(Some)
    }
}

/// Read a declarative extension file; its own `name` wins over `fallback_name`.
fn load_file(
    path: &Path,
    fallback_name: &str,
    config: &SiteConfig,
) -> Result<Extension, ExtensionLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExtensionLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec: ExtensionSpec =
        serde_yaml::from_str(&content).map_err(|source| ExtensionLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let name = spec.name.as_deref().unwrap_or(fallback_name);
    Ok(declarative_extension(name, &spec, config))
}
