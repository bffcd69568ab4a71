//! Metadata enrichment step.

use crate::build::document::Document;
use crate::build::pipeline::{StepError, TransformStep};
use crate::config::SiteConfig;

/// Reading speed used for the reading time estimate.
pub const WORDS_PER_MINUTE: u64 = 200;

/// Stage that attaches template conveniences: `formatted_date`,
/// `reading_time` (minutes) and the site display data.
pub struct MetadataStep;

impl TransformStep for MetadataStep {
    fn name(&self) -> &str {
        "metadata"
    }

    fn apply(&self, mut doc: Document, config: &SiteConfig) -> Result<Document, StepError> {
        doc.metadata.formatted_date = Some(doc.metadata.date.format("%B %-d, %Y").to_string());
        doc.metadata.reading_time = Some(reading_time(&doc.raw_body));
        doc.metadata.site = Some(config.site.clone());
        Ok(doc)
    }
}

/// Minutes needed to read `text`, rounded up.
pub fn reading_time(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    words.div_ceil(WORDS_PER_MINUTE)
}
