//! Extensions compiled into the binary.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{Extension, ExtensionLoadError, ExtensionLoader};
use crate::build::document::Document;
use crate::build::pipeline::{StepError, TransformStep};
use crate::config::SiteConfig;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Names known to the catalog, with their constructors.
const CATALOG: &[(&str, fn() -> Extension)] = &[("word-count", word_count)];

/// Resolves names against the compiled-in catalog.
pub struct CatalogLoader;

impl ExtensionLoader for CatalogLoader {
    fn name(&self) -> &str {
        "catalog"
    }

    fn load(
        &self,
        name: &str,
        _config: &SiteConfig,
    ) -> Result<Option<Extension>, ExtensionLoadError> {
        Ok(CATALOG
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, build)| build()))
    }
}

fn word_count() -> Extension {
    Extension::new("word-count")
        .with_transform(WordCountStep)
        .with_render(WordCountHelper)
}

/// Words in text, ignoring any HTML tags.
fn count_words(text: &str) -> usize {
    HTML_TAG.replace_all(text, " ").split_whitespace().count()
}

/// Adds `page.word_count`.
struct WordCountStep;

impl TransformStep for WordCountStep {
    fn name(&self) -> &str {
        "word-count"
    }

    fn apply(&self, mut doc: Document, _config: &SiteConfig) -> Result<Document, StepError> {
        let count = count_words(&doc.raw_body) as u64;
        doc.metadata
            .extra
            .insert("word_count".to_string(), serde_yaml::Value::Number(count.into()));
        Ok(doc)
    }
}

/// `{{ word_count(text=content) }}`
struct WordCountHelper;

impl tera::Function for WordCountHelper {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let text = args
            .get("text")
            .and_then(tera::Value::as_str)
            .ok_or_else(|| tera::Error::msg("word_count: expected a `text` argument"))?;
        Ok(tera::Value::from(count_words(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::DocumentKind;
    use crate::build::pipeline::tests::sample_document;
    use tera::Function;

    #[test]
    fn test_catalog_lookup() {
        let config = SiteConfig::default();
        assert!(CatalogLoader.load("word-count", &config).unwrap().is_some());
        assert!(CatalogLoader.load("nope", &config).unwrap().is_none());
    }

    #[test]
    fn test_word_count_step() {
        let doc = sample_document(DocumentKind::Post, "one two\nthree");
        let doc = WordCountStep.apply(doc, &SiteConfig::default()).unwrap();
        assert_eq!(
            doc.metadata.extra.get("word_count"),
            Some(&serde_yaml::Value::Number(3.into()))
        );
    }

    #[test]
    fn test_word_count_helper_ignores_tags() {
        let mut args = HashMap::new();
        args.insert(
            "text".to_string(),
            tera::Value::String("<p>Hello <em>big</em> world</p>".to_string()),
        );
        assert_eq!(WordCountHelper.call(&args).unwrap(), tera::Value::from(3));
        assert!(WordCountHelper.call(&HashMap::new()).is_err());
    }
}
