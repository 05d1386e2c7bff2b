//! Error types for the example session.

use esplus_repository::MapperError;
use thiserror::Error;

/// Errors that can occur while running the session steps.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A mapper call failed.
    #[error("Mapper error: {0}")]
    MapperError(#[from] MapperError),

    /// A step returned something other than what the session wrote.
    #[error("Unexpected result in step '{step}': {detail}")]
    UnexpectedResult { step: &'static str, detail: String },
}

impl SessionError {
    /// Create an unexpected-result error for a session step.
    pub fn unexpected(step: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedResult {
            step,
            detail: detail.into(),
        }
    }
}
