use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::document::Document;
use super::parser::{ContentParser, ParseError};
use super::paths::{is_hidden, output_path_for};
use super::pipeline::{Pipeline, TransformError};
use super::render::{RenderError, Renderer};
use crate::config::SiteConfig;
use crate::extension::{Extension, ExtensionRegistry};
use crate::theme::Theme;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("failed to copy asset {path}: {source}")]
    AssetCopy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    /// Documents rendered, not counting the home page
    pub documents: usize,
    /// Documents skipped because they are drafts
    pub drafts: usize,
    /// Theme asset files copied
    pub assets: usize,
}

/// Builds a whole site from a configuration.
///
/// Extensions named in the configuration are resolved when the builder is
/// created; extensions passed to [`Builder::with_extensions`] run after them.
pub struct Builder {
    config: Arc<SiteConfig>,
    extensions: Vec<Extension>,
}

impl Builder {
    pub fn new(config: Arc<SiteConfig>) -> Self {
        let registry = ExtensionRegistry::with_default_loaders(config.clone());
        let extensions = registry.load(&config.extensions);
        Self { config, extensions }
    }

    /// Add pre-built extensions.
    #[allow(dead_code)]
    pub fn with_extensions(mut self, extensions: Vec<Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Build the site into the output directory.
    ///
    /// The site is written to a staging directory next to the output
    /// directory and swapped in only once every document has been written,
    /// so a failed build leaves the previous output as it was.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let output_dir = self.config.output_path();
        let staging = sibling_dir(&output_dir, "staging")?;

        info!("building {}", output_dir.display());
        let result = match self.build_into(&staging) {
            Ok(result) => result,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        swap_into_place(&staging, &output_dir)?;

        info!(
            "wrote {} document(s) and {} asset(s) to {}",
            result.documents,
            result.assets,
            output_dir.display()
        );
        Ok(BuildResult {
            output_dir,
            ..result
        })
    }

    /// Build the site into `target`, replacing whatever it holds.
    pub fn build_into(&self, target: &Path) -> Result<BuildResult, BuildError> {
        // Steps:
        // 1. Recreate the target directory
        // 2. Load layouts and wire extension helpers into the renderer
        // 3. Copy theme assets
        // 4. Parse, transform, render and write each document
        // 5. Render the home page from the collected documents
        if target.exists() {
            std::fs::remove_dir_all(target)?;
        }
        std::fs::create_dir_all(target)?;

        let theme = Theme::new(self.config.theme_path());
        let mut renderer = Renderer::new(&theme, self.config.site.clone())?;
        let mut pipeline = Pipeline::new(self.config.clone());
        for extension in &self.extensions {
            if let Some(step) = extension.transform() {
                pipeline.add_step(step);
            }
            if let Some(helper) = extension.render() {
                renderer.register_helper(&extension.helper_name(), helper);
            }
        }

        let assets = copy_assets(&theme.assets_dir(), target)?;

        let source_root = self.config.source_path();
        let parser = ContentParser::new(&self.config);
        let mut collection: Vec<Document> = Vec::new();
        let mut drafts = 0;

        for path in self.content_files(&source_root)? {
            let doc = parser.parse(&path)?;
            if doc.metadata.draft {
                debug!("skipping draft {}", path.display());
                drafts += 1;
                continue;
            }

            let doc = pipeline.transform(doc)?;
            let html = renderer.render(&doc)?;

            let relative = path.strip_prefix(&source_root).unwrap_or(&path);
            let output_path = output_path_for(relative, target, &self.config.output_extension);
            write_file(&output_path, &html)?;
            debug!("wrote {}", output_path.display());

            collection.push(doc);
        }

        let home = renderer.render_home(&collection)?;
        write_file(
            &target.join(format!("index.{}", self.config.output_extension)),
            &home,
        )?;

        Ok(BuildResult {
            output_dir: target.to_path_buf(),
            documents: collection.len(),
            drafts,
            assets,
        })
    }

    /// Every content file under the source root, sorted by path.
    fn content_files(&self, source_root: &Path) -> Result<Vec<PathBuf>, BuildError> {
        if !source_root.is_dir() {
            info!("source directory {} does not exist", source_root.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(source_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(Path::new(e.file_name())));

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|e| e.to_str())
                    == Some(self.config.content_extension.as_str())
            {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }
}

/// Copy the theme's assets directory into the output root.
fn copy_assets(assets_dir: &Path, target: &Path) -> Result<usize, BuildError> {
    if !assets_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(assets_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::AssetCopy {
            path: e.path().unwrap_or(assets_dir).to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        let relative = path.strip_prefix(assets_dir).unwrap_or(path);
        let destination = target.join(relative);

        let result = if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)
        } else {
            std::fs::copy(path, &destination).map(|_| {
                copied += 1;
            })
        };
        result.map_err(|source| BuildError::AssetCopy {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(copied)
}

fn write_file(path: &Path, contents: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// A hidden directory next to `dir`, e.g. `public` -> `.public.staging`.
fn sibling_dir(dir: &Path, suffix: &str) -> Result<PathBuf, std::io::Error> {
    let name = dir.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("output directory has no name: {}", dir.display()),
        )
    })?;
    Ok(dir.with_file_name(format!(".{}.{}", name.to_string_lossy(), suffix)))
}

/// Replace `output` with `staging`.
fn swap_into_place(staging: &Path, output: &Path) -> Result<(), std::io::Error> {
    if !output.exists() {
        return std::fs::rename(staging, output);
    }

    let previous = sibling_dir(output, "previous")?;
    if previous.exists() {
        std::fs::remove_dir_all(&previous)?;
    }
    std::fs::rename(output, &previous)?;
    std::fs::rename(staging, output)?;
    std::fs::remove_dir_all(&previous)
}
