//! Path and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Source file paths (relative paths within the source directory)
//! - URL paths (the URL at which a document will be served)
//! - Output file paths (where files are written in the output directory)

use std::path::{Component, Path, PathBuf};

/// Convert a source-relative document path to its site-root URL.
///
/// The source extension is swapped for the output extension and path
/// separators are normalized to `/`.
///
/// # Examples
/// ```ignore
/// source_path_to_url("about.md", "html") => "/about.html"
/// source_path_to_url("posts/2024-01-01-hello.md", "html") => "/posts/2024-01-01-hello.html"
/// ```
pub fn source_path_to_url(relative: &Path, output_extension: &str) -> String {
    let with_ext = relative.with_extension(output_extension);
    let segments: Vec<String> = with_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    format!("/{}", segments.join("/"))
}

/// Mirror a source-relative document path under the output directory.
///
/// # Examples
/// ```ignore
/// output_path_for("posts/hello.md", "/site", "html") => "/site/posts/hello.html"
/// ```
pub fn output_path_for(relative: &Path, output_dir: &Path, output_extension: &str) -> PathBuf {
    output_dir.join(relative.with_extension(output_extension))
}

/// Whether a source-relative path lives under the `posts` directory.
pub fn is_post_path(relative: &Path) -> bool {
    matches!(relative.components().next(), Some(Component::Normal(first)) if first == "posts")
}

/// Whether any component of the path is hidden (starts with `.`).
pub fn is_hidden(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(s) if s.to_string_lossy().starts_with('.')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_source_path_to_url_simple() {
        assert_eq!(
            source_path_to_url(Path::new("about.md"), "html"),
            "/about.html"
        );
    }

    #[test]
    fn test_source_path_to_url_nested() {
        assert_eq!(
            source_path_to_url(Path::new("posts/2024-01-01-hello.md"), "html"),
            "/posts/2024-01-01-hello.html"
        );
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("posts/hello.md"), Path::new("/site"), "html"),
            PathBuf::from("/site/posts/hello.html")
        );
    }

    #[test]
    fn test_is_post_path() {
        assert!(is_post_path(Path::new("posts/hello.md")));
        assert!(is_post_path(Path::new("posts/2024/hello.md")));
        assert!(!is_post_path(Path::new("pages/about.md")));
        assert!(!is_post_path(Path::new("postscript.md")));
        assert!(!is_post_path(Path::new("notes/posts/hello.md")));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new(".git/config")));
        assert!(is_hidden(Path::new("posts/.draft.md")));
        assert!(!is_hidden(Path::new("posts/hello.md")));
    }
}
