//! Search transport trait definition.
//!
//! This module defines the abstract interface for round trips to the search
//! backend, allowing for different implementations (OpenSearch, Elasticsearch,
//! in-memory mocks for tests).

use async_trait::async_trait;
use esplus_shared::SearchResponse;
use serde_json::Value;

use crate::errors::MapperError;
use crate::types::{BulkOperation, BulkResponse, WriteResponse};

/// Abstracts the wire calls made against the search backend.
///
/// Every method is exactly one round trip. Implementations are injected into
/// `DocumentMapper` and shared between mappers, so they must be safe to use
/// from several in-flight operations at once.
///
/// A response with a non-success HTTP status is reported as
/// `MapperError::TransportError`, except where a method documents otherwise.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Index a full document.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `id` - Document identifier, or `None` to let the backend generate one
    /// * `document` - The wire document
    ///
    /// # Returns
    ///
    /// * `Ok(WriteResponse)` - Status 201 when created, 200 when an existing document was replaced
    /// * `Err(MapperError)` - If the round trip fails
    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<WriteResponse, MapperError>;

    /// Merge a partial document into an existing document.
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<WriteResponse, MapperError>;

    /// Delete a document.
    ///
    /// A missing document is not an error: the response carries status 404.
    async fn delete_document(&self, index: &str, id: &str) -> Result<WriteResponse, MapperError>;

    /// Send every operation in a single bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - Per-item statuses, in request order
    /// * `Err(MapperError)` - If the bulk request fails entirely
    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, MapperError>;

    /// Run a search request body against an index.
    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, MapperError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, MapperError>;

    /// Create an index from a settings/mappings/aliases body.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the backend acknowledged the creation
    async fn create_index(&self, index: &str, body: &Value) -> Result<bool, MapperError>;

    /// Delete an index.
    async fn delete_index(&self, index: &str) -> Result<bool, MapperError>;
}
