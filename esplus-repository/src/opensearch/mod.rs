//! OpenSearch implementation of the search transport.
//!
//! This module provides a concrete implementation of `SearchTransport`
//! using OpenSearch as the backend.

mod index_config;
mod provider;
mod response;

pub use index_config::IndexDefinition;
pub use provider::OpenSearchTransport;
