//! # esplus Example
//!
//! A small session against a live OpenSearch node that exercises the
//! document mapper end to end.
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`document`]: The `TestDocument` entity and its metadata
//! - [`session`]: The scripted insert, query, update and delete steps
//! - [`errors`]: Error types for the session

pub mod config;
pub mod document;
pub mod errors;
pub mod session;

pub use config::Dependencies;
pub use document::TestDocument;
pub use errors::SessionError;
pub use session::{Session, SessionReport};

use thiserror::Error;

/// Errors that can occur during example initialization or execution.
#[derive(Error, Debug)]
pub enum ExampleError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session error.
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),
}

impl ExampleError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
