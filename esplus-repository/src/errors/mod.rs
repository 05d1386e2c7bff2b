//! Error types for the esplus repository.
//!
//! This module provides a unified error type for all mapper operations.

mod mapper_error;

pub use mapper_error::MapperError;
