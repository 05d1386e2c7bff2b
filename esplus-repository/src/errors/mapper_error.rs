//! Mapper error types.
//!
//! This module defines the unified error type for all mapper operations,
//! covering input validation, request assembly, the wire transport, batch
//! reconciliation and document encoding.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified errors from mapper operations.
///
/// Used by the `SearchTransport` trait and `DocumentMapper` for every operation.
/// None of these are recovered locally: each is surfaced to the caller as soon
/// as it occurs.
#[derive(Debug, Error)]
pub enum MapperError {
    /// Validation error (e.g., blank identifier, empty input collection, malformed condition list).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The request asks for something the mapper does not support.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A round trip to the backend failed.
    #[error("Transport error: {message}")]
    TransportError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// An insert batch reported at least one failed item.
    ///
    /// The backend may have applied part of the batch; callers must treat the
    /// state as indeterminate.
    #[error("Batch failure: {failed} of {total} operations failed")]
    BatchFailure {
        total: usize,
        failed: usize,
        /// Always 0: a failed insert batch reports no successes.
        succeeded: usize,
    },

    /// An entity or response could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MapperError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create a transport error without an underlying cause.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the original cause.
    pub fn transport_with<E>(msg: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransportError {
            message: msg.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create a batch failure error. The success count is always 0.
    pub fn batch_failure(total: usize, failed: usize) -> Self {
        Self::BatchFailure {
            total,
            failed,
            succeeded: 0,
        }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<opensearch::Error> for MapperError {
    fn from(err: opensearch::Error) -> Self {
        Self::transport_with(err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_batch_failure_reports_zero_successes() {
        let err = MapperError::batch_failure(10, 1);
        assert!(matches!(
            err,
            MapperError::BatchFailure {
                total: 10,
                failed: 1,
                succeeded: 0
            }
        ));
        assert_eq!(err.to_string(), "Batch failure: 1 of 10 operations failed");
    }

    #[test]
    fn test_transport_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = MapperError::transport_with("bulk request failed", cause);
        assert_eq!(err.to_string(), "Transport error: bulk request failed");
        let source = err.source().expect("cause should be kept");
        assert_eq!(source.to_string(), "reset by peer");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: MapperError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, MapperError::SerializationError(_)));
    }
}
