//! Extensions: named bundles of a transform step and/or a template helper.
//!
//! Extensions are listed in the `extensions` config key and resolved by an
//! ordered list of [`ExtensionLoader`]s. The first loader that knows a name
//! wins. A reference nobody can resolve is logged and skipped, it never
//! fails the build.

mod catalog;
mod declarative;
mod loader;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

pub use catalog::CatalogLoader;
pub use declarative::declarative_extension;
pub use loader::{DirectoryLoader, ExtensionLoader, PathLoader};

use crate::build::pipeline::TransformStep;
use crate::config::{ExtensionRef, SiteConfig};

/// A loaded extension.
#[derive(Clone)]
pub struct Extension {
    name: String,
    transform: Option<Arc<dyn TransformStep>>,
    render: Option<Arc<dyn tera::Function>>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: None,
            render: None,
        }
    }

    /// Attach a step that runs after the built-in transform steps.
    pub fn with_transform(mut self, step: impl TransformStep + 'static) -> Self {
        self.transform = Some(Arc::new(step));
        self
    }

    /// Attach a template function, registered under [`Extension::helper_name`].
    pub fn with_render(mut self, helper: impl tera::Function + 'static) -> Self {
        self.render = Some(Arc::new(helper));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template name of the render helper; dashes are not valid in template
    /// identifiers, so `word-count` becomes `word_count`.
    pub fn helper_name(&self) -> String {
        self.name.replace('-', "_")
    }

    pub fn transform(&self) -> Option<Arc<dyn TransformStep>> {
        self.transform.clone()
    }

    pub fn render(&self) -> Option<SharedHelper> {
        self.render.clone().map(SharedHelper)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("transform", &self.transform.as_ref().map(|s| s.name().to_string()))
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// A render helper shared between the extension and the template engine.
pub struct SharedHelper(Arc<dyn tera::Function>);

impl tera::Function for SharedHelper {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExtensionLoadError {
    #[error("extension not found: {0}")]
    NotFound(String),

    #[error("failed to read extension {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid extension file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid extension entry: {0}")]
    Invalid(String),
}

/// Resolves extension references through an ordered list of loaders.
pub struct ExtensionRegistry {
    config: Arc<SiteConfig>,
    loaders: Vec<Box<dyn ExtensionLoader>>,
}

impl ExtensionRegistry {
    /// A registry with explicit loaders, tried in order.
    pub fn new(config: Arc<SiteConfig>, loaders: Vec<Box<dyn ExtensionLoader>>) -> Self {
        Self { config, loaders }
    }

    /// The standard lookup order: compiled-in catalog, then the
    /// `extensions/` directory next to the config file, then a path relative
    /// to the config file.
    pub fn with_default_loaders(config: Arc<SiteConfig>) -> Self {
        let root = config.root.clone();
        let loaders: Vec<Box<dyn ExtensionLoader>> = vec![
            Box::new(CatalogLoader),
            Box::new(DirectoryLoader::new(root.join("extensions"))),
            Box::new(PathLoader::new(root)),
        ];
        Self::new(config, loaders)
    }

    /// Load every reference, skipping the ones that cannot be resolved.
    pub fn load(&self, refs: &[ExtensionRef]) -> Vec<Extension> {
        refs.iter()
            .filter_map(|entry| match self.load_one(entry) {
                Ok(extension) => {
                    debug!("loaded extension '{}'", extension.name());
                    Some(extension)
                }
                Err(e) => {
                    warn!("skipping extension: {}", e);
                    None
                }
            })
            .collect()
    }

    fn load_one(&self, entry: &ExtensionRef) -> Result<Extension, ExtensionLoadError> {
        match entry {
            ExtensionRef::Named(name) => self.resolve(name),
            ExtensionRef::Inline(spec) => {
                let name = spec.name.clone().ok_or_else(|| {
                    ExtensionLoadError::Invalid("inline extension without a name".to_string())
                })?;
                Ok(declarative_extension(&name, spec, &self.config))
            }
            ExtensionRef::Invalid(value) => Err(ExtensionLoadError::Invalid(
                serde_yaml::to_string(value)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            )),
        }
    }

    fn resolve(&self, name: &str) -> Result<Extension, ExtensionLoadError> {
        for loader in &self.loaders {
            if let Some(extension) = loader.load(name, &self.config)? {
                debug!("extension '{}' resolved by {} loader", name, loader.name());
                return Ok(extension);
            }
        }
        Err(ExtensionLoadError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::Document;
    use crate::build::pipeline::StepError;

    struct Fixed;

    impl ExtensionLoader for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn load(
            &self,
            name: &str,
            _config: &SiteConfig,
        ) -> Result<Option<Extension>, ExtensionLoadError> {
            Ok((name == "fixed").then(|| Extension::new("fixed")))
        }
    }

    struct Noop;

    impl TransformStep for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn apply(&self, doc: Document, _config: &SiteConfig) -> Result<Document, StepError> {
            Ok(doc)
        }
    }

    fn config_in(dir: &std::path::Path) -> Arc<SiteConfig> {
        Arc::new(SiteConfig {
            root: dir.to_path_buf(),
            ..SiteConfig::default()
        })
    }

    #[test]
    fn test_unknown_and_invalid_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ExtensionRegistry::new(config_in(dir.path()), vec![Box::new(Fixed)]);

        let refs = vec![
            ExtensionRef::Named("missing".to_string()),
            ExtensionRef::Invalid(serde_yaml::Value::Number(42.into())),
            ExtensionRef::Named("fixed".to_string()),
        ];
        let loaded = registry.load(&refs);
        let names: Vec<_> = loaded.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["fixed"]);
    }

    #[test]
    fn test_first_loader_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("extensions")).unwrap();
        // Shadowed by the compiled-in catalog
        std::fs::write(
            dir.path().join("extensions/word-count.yaml"),
            "snippet: shadowed\n",
        )
        .unwrap();

        let registry = ExtensionRegistry::with_default_loaders(config_in(dir.path()));
        let loaded = registry.load(&[ExtensionRef::Named("word-count".to_string())]);
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].transform().map(|s| s.name().to_string()),
            Some("word-count".to_string())
        );
    }

    #[test]
    fn test_inline_entries_need_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ExtensionRegistry::with_default_loaders(config_in(dir.path()));

        let refs = vec![
            ExtensionRef::Inline(crate::config::ExtensionSpec {
                name: None,
                snippet: Some("x".to_string()),
                ..Default::default()
            }),
            ExtensionRef::Inline(crate::config::ExtensionSpec {
                name: Some("badge".to_string()),
                snippet: Some("<b>{label}</b>".to_string()),
                ..Default::default()
            }),
        ];
        let loaded = registry.load(&refs);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name(), "badge");
        assert!(loaded[0].render().is_some());
    }

    #[test]
    fn test_helper_name() {
        let extension = Extension::new("word-count").with_transform(Noop);
        assert_eq!(extension.helper_name(), "word_count");
        assert!(extension.render().is_none());
    }
}
