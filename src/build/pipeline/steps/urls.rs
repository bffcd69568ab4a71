//! URL normalization step.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::build::document::Document;
use crate::build::pipeline::{StepError, TransformStep};
use crate::config::SiteConfig;

static LINK_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s)(src|href)="([^"]+)""#).unwrap());

/// Targets that already point somewhere absolute.
const ABSOLUTE_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "tel:", "#", "//", "data:"];

/// Stage that applies the site base URL.
///
/// Relative `src`/`href` targets in the body get the base URL in front, and
/// the document URL is made root-relative and prefixed once.
pub struct UrlStep;

impl TransformStep for UrlStep {
    fn name(&self) -> &str {
        "urls"
    }

    fn apply(&self, mut doc: Document, config: &SiteConfig) -> Result<Document, StepError> {
        let base_url = config.site.base_url.as_str();

        doc.rendered_body = rewrite_links(&doc.rendered_body, base_url);

        if !doc.metadata.url.starts_with('/') {
            doc.metadata.url = format!("/{}", doc.metadata.url);
        }

        let prefix = base_url.trim_end_matches('/');
        if !prefix.is_empty() && !doc.metadata.url.starts_with(&format!("{}/", prefix)) {
            doc.metadata.url = format!("{}{}", prefix, doc.metadata.url);
        }

        Ok(doc)
    }
}

/// Prefix every relative link and image target with the base URL.
pub fn rewrite_links(html: &str, base_url: &str) -> String {
    let prefix = base_url.trim_end_matches('/');

    LINK_ATTR
        .replace_all(html, |caps: &Captures| {
            let target = &caps[3];
            let is_absolute = ABSOLUTE_PREFIXES.iter().any(|p| target.starts_with(p));
            let has_prefix = !prefix.is_empty() && target.starts_with(&format!("{}/", prefix));

            if is_absolute || has_prefix {
                caps[0].to_string()
            } else {
                format!(
                    "{}{}=\"{}/{}\"",
                    &caps[1],
                    &caps[2],
                    prefix,
                    target.trim_start_matches('/')
                )
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::DocumentKind;
    use crate::build::pipeline::tests::sample_document;
    use crate::config::SiteData;

    fn config_with_base(base_url: &str) -> SiteConfig {
        SiteConfig {
            site: SiteData {
                base_url: base_url.to_string(),
                ..SiteData::default()
            },
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_relative_link_gets_base_url() {
        assert_eq!(
            rewrite_links(r#"<a href="foo.html">foo</a>"#, "/blog/"),
            r#"<a href="/blog/foo.html">foo</a>"#
        );
    }

    #[test]
    fn test_absolute_links_are_untouched() {
        for html in [
            r#"<a href="https://example.com">x</a>"#,
            r#"<a href="http://example.com">x</a>"#,
            r#"<a href="mailto:me@example.com">x</a>"#,
            r#"<a href="tel:+100">x</a>"#,
            r##"<a href="#section">x</a>"##,
        ] {
            assert_eq!(rewrite_links(html, "/blog/"), html);
        }
    }

    #[test]
    fn test_images_are_rewritten() {
        assert_eq!(
            rewrite_links(r#"<img src="img/cat.png" alt="cat" />"#, "/blog/"),
            r#"<img src="/blog/img/cat.png" alt="cat" />"#
        );
    }

    #[test]
    fn test_data_attributes_are_untouched() {
        assert_eq!(
            rewrite_links(
                r#"<img data-src="lazy.png" src="cat.png"><a data-href="x.html" href="y.html">y</a>"#,
                "/blog/"
            ),
            r#"<img data-src="lazy.png" src="/blog/cat.png"><a data-href="x.html" href="/blog/y.html">y</a>"#
        );
    }

    #[test]
    fn test_root_base_url() {
        assert_eq!(
            rewrite_links(r#"<a href="foo.html">foo</a>"#, "/"),
            r#"<a href="/foo.html">foo</a>"#
        );
        assert_eq!(
            rewrite_links(r#"<a href="/foo.html">foo</a>"#, "/"),
            r#"<a href="/foo.html">foo</a>"#
        );
    }

    #[test]
    fn test_already_prefixed_target_is_untouched() {
        let html = r#"<a href="/blog/foo.html">foo</a>"#;
        assert_eq!(rewrite_links(html, "/blog/"), html);
    }

    #[test]
    fn test_document_url_is_prefixed_once() {
        let config = config_with_base("/blog/");
        let doc = UrlStep
            .apply(sample_document(DocumentKind::Post, ""), &config)
            .unwrap();
        assert_eq!(doc.metadata.url, "/blog/posts/sample.html");

        let doc = UrlStep.apply(doc, &config).unwrap();
        assert_eq!(doc.metadata.url, "/blog/posts/sample.html");
        assert_eq!(
            doc.rendered_body,
            r#"<p><a href="/blog/next.html">next</a></p>"#
        );
    }

    #[test]
    fn test_document_url_gets_leading_slash() {
        let mut doc = sample_document(DocumentKind::Page, "");
        doc.metadata.url = "about.html".to_string();
        let doc = UrlStep.apply(doc, &config_with_base("/")).unwrap();
        assert_eq!(doc.metadata.url, "/about.html");
    }
}
