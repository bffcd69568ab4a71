//! Pipeline error types.

/// Error raised by a single transform step.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct StepError(String);

impl StepError {
    #[allow(dead_code)]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur during document transformation.
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("step '{step}' failed on '{identifier}': {message}")]
    Step {
        step: String,
        identifier: String,
        message: String,
    },
}

impl TransformError {
    /// Create a step-specific error.
    pub fn step(step: impl Into<String>, identifier: impl Into<String>, error: StepError) -> Self {
        Self::Step {
            step: step.into(),
            identifier: identifier.into(),
            message: error.0,
        }
    }
}
