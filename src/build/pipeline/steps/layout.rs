//! Layout assignment step.

use crate::build::document::{Document, DocumentKind};
use crate::build::pipeline::{StepError, TransformStep};
use crate::config::SiteConfig;

/// Layout used for posts that do not name one.
pub const POST_LAYOUT: &str = "post";

/// Layout used for everything else, and the fallback for unknown layouts.
pub const DEFAULT_LAYOUT: &str = "default";

/// Stage that fills in `layout` from the document type.
pub struct LayoutStep;

impl TransformStep for LayoutStep {
    fn name(&self) -> &str {
        "layout"
    }

    fn apply(&self, mut doc: Document, _config: &SiteConfig) -> Result<Document, StepError> {
        if doc.metadata.layout.as_deref().is_none_or(str::is_empty) {
            let layout = match doc.metadata.kind {
                DocumentKind::Post => POST_LAYOUT,
                DocumentKind::Page => DEFAULT_LAYOUT,
            };
            doc.metadata.layout = Some(layout.to_string());
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::pipeline::tests::sample_document;

    #[test]
    fn test_posts_get_post_layout() {
        let doc = LayoutStep
            .apply(sample_document(DocumentKind::Post, ""), &SiteConfig::default())
            .unwrap();
        assert_eq!(doc.metadata.layout.as_deref(), Some("post"));
    }

    #[test]
    fn test_pages_get_default_layout() {
        let doc = LayoutStep
            .apply(sample_document(DocumentKind::Page, ""), &SiteConfig::default())
            .unwrap();
        assert_eq!(doc.metadata.layout.as_deref(), Some("default"));
    }

    #[test]
    fn test_explicit_layout_is_kept() {
        let mut doc = sample_document(DocumentKind::Post, "");
        doc.metadata.layout = Some("wide".to_string());
        let doc = LayoutStep.apply(doc, &SiteConfig::default()).unwrap();
        assert_eq!(doc.metadata.layout.as_deref(), Some("wide"));
    }
}
