//! Transform pipeline for parsed documents.
//!
//! Every document passes through the same ordered list of steps:
//! 1. Layout assignment
//! 2. URL normalization
//! 3. Metadata enrichment
//! 4. Extension steps, in registration order
//!
//! Steps take the document by value and hand back the transformed one, so a
//! failing step leaves nothing half-applied for the caller to see.

mod error;
mod steps;

use std::sync::Arc;

pub use error::{StepError, TransformError};
pub use steps::{DEFAULT_LAYOUT, LayoutStep, MetadataStep, UrlStep};

use super::document::Document;
use crate::config::SiteConfig;

/// A step in the document transform pipeline.
pub trait TransformStep: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Transform one document.
    fn apply(&self, doc: Document, config: &SiteConfig) -> Result<Document, StepError>;
}

/// A named closure used as a step.
#[allow(dead_code)]
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn(Document, &SiteConfig) -> Result<Document, StepError> + Send + Sync,
{
    #[allow(dead_code)]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> TransformStep for FnStep<F>
where
    F: Fn(Document, &SiteConfig) -> Result<Document, StepError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: Document, config: &SiteConfig) -> Result<Document, StepError> {
        (self.f)(doc, config)
    }
}

/// The document transform pipeline.
///
/// # Extension Points
///
/// Register custom steps with `add_step`; they run after the built-in steps:
///
/// ```ignore
/// pipeline.add_step(Arc::new(MyStep));
/// ```
pub struct Pipeline {
    config: Arc<SiteConfig>,
    /// Built-in steps, always run first
    builtin: Vec<Arc<dyn TransformStep>>,
    /// Externally registered steps
    registered: Vec<Arc<dyn TransformStep>>,
}

impl Pipeline {
    /// Create a pipeline with the built-in steps.
    pub fn new(config: Arc<SiteConfig>) -> Self {
        Self {
            config,
            builtin: vec![
                Arc::new(LayoutStep) as Arc<dyn TransformStep>,
                Arc::new(UrlStep),
                Arc::new(MetadataStep),
            ],
            registered: Vec::new(),
        }
    }

    /// Add a step to the end of the pipeline.
    pub fn add_step(&mut self, step: Arc<dyn TransformStep>) -> &mut Self {
        self.registered.push(step);
        self
    }

    /// Run every step over a document, stopping at the first failure.
    pub fn transform(&self, doc: Document) -> Result<Document, TransformError> {
        let identifier = doc.identifier().to_string();
        self.builtin
            .iter()
            .chain(&self.registered)
            .try_fold(doc, |doc, step| {
                step.apply(doc, &self.config)
                    .map_err(|e| TransformError::step(step.name(), &identifier, e))
            })
    }

    /// Get the names of all steps in order.
    #[allow(dead_code)]
    pub fn step_names(&self) -> Vec<&str> {
        self.builtin
            .iter()
            .chain(&self.registered)
            .map(|s| s.name())
            .collect()
    }
}
