//! Theme directory access.
//!
//! A theme is a directory with a `layouts/` subdirectory (one template per
//! file, named by its file stem) and an optional `assets/` subdirectory that
//! is copied verbatim into the output root.

use std::path::{Path, PathBuf};

use crate::build::paths::is_hidden;

/// A single layout template, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub source: String,
}

impl Layout {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Anything that can hand the renderer its layout templates.
pub trait LayoutSource {
    fn load_layouts(&self) -> Result<Vec<Layout>, ThemeError>;
}

/// In-memory layouts, mostly useful for tests and embedding.
impl LayoutSource for Vec<Layout> {
    fn load_layouts(&self) -> Result<Vec<Layout>, ThemeError> {
        Ok(self.clone())
    }
}

/// A theme on disk.
#[derive(Debug, Clone)]
pub struct Theme {
    root: PathBuf,
}

impl Theme {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.root.join("layouts")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }
}

impl LayoutSource for Theme {
    /// Read every file in `layouts/`, sorted by name.
    fn load_layouts(&self) -> Result<Vec<Layout>, ThemeError> {
        let dir = self.layouts_dir();
        if !dir.is_dir() {
            return Err(ThemeError::LayoutsNotFound(dir));
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ThemeError::Io(dir.clone(), e))?;

        let mut layouts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ThemeError::Io(dir.clone(), e))?;
            let path = entry.path();
            if !path.is_file() || is_hidden(Path::new(&entry.file_name())) {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source =
                std::fs::read_to_string(&path).map_err(|e| ThemeError::Io(path.clone(), e))?;
            layouts.push(Layout::new(name, source));
        }

        layouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(layouts)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ThemeError {
    #[error("theme has no layouts directory: {0}")]
    LayoutsNotFound(PathBuf),

    #[error("failed to read theme file {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_layouts_by_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let layouts = dir.path().join("layouts");
        std::fs::create_dir_all(&layouts).unwrap();
        std::fs::write(layouts.join("post.html"), "post: {{ content }}").unwrap();
        std::fs::write(layouts.join("default.html"), "default").unwrap();
        std::fs::write(layouts.join(".swap.html"), "ignored").unwrap();

        let loaded = Theme::new(dir.path()).load_layouts().unwrap();
        let names: Vec<_> = loaded.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["default", "post"]);
        assert_eq!(loaded[1].source, "post: {{ content }}");
    }

    #[test]
    fn test_missing_layouts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = Theme::new(dir.path()).load_layouts().unwrap_err();
        assert!(matches!(err, ThemeError::LayoutsNotFound(_)));
    }
}
