//! OpenSearch transport implementation.
//!
//! This module provides the concrete implementation of `SearchTransport`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use esplus_shared::SearchResponse;
use opensearch::{
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    BulkParts, DeleteParts, IndexParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::MapperError;
use crate::interfaces::SearchTransport;
use crate::opensearch::response::{
    parse_bulk_response, parse_search_response, parse_write_response,
};
use crate::types::{BulkOperation, BulkResponse, WriteResponse};

/// OpenSearch transport implementation.
///
/// One client is shared by every mapper built on this transport.
///
/// # Example
///
/// ```ignore
/// use esplus_repository::opensearch::OpenSearchTransport;
///
/// let transport = OpenSearchTransport::new("http://localhost:9200").await?;
/// let exists = transport.index_exists("users").await?;
/// ```
pub struct OpenSearchTransport {
    client: OpenSearch,
}

impl OpenSearchTransport {
    /// Create a new OpenSearch transport connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchTransport)` - A new transport instance
    /// * `Err(MapperError)` - If the URL is invalid or connection setup fails
    pub async fn new(url: &str) -> Result<Self, MapperError> {
        let parsed_url = Url::parse(url)
            .map_err(|e| MapperError::transport_with(format!("Invalid URL '{}'", url), e))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| MapperError::transport_with("Failed to build transport", e))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch transport");

        Ok(Self { client })
    }

    /// Build the newline-delimited bulk body: an action line per operation,
    /// followed by a source line for index and update operations.
    fn bulk_lines(operations: &[BulkOperation]) -> Vec<Value> {
        let mut body = Vec::with_capacity(operations.len() * 2);
        for operation in operations {
            match operation {
                BulkOperation::Index { id, document } => {
                    let action = match id {
                        Some(id) => json!({ "index": { "_id": id } }),
                        None => json!({ "index": {} }),
                    };
                    body.push(action);
                    body.push(document.clone());
                }
                BulkOperation::Update { id, document } => {
                    body.push(json!({ "update": { "_id": id } }));
                    body.push(json!({ "doc": document }));
                }
                BulkOperation::Delete { id } => {
                    body.push(json!({ "delete": { "_id": id } }));
                }
            }
        }
        body
    }

    /// Fail with the status and body of an unsuccessful response.
    async fn ensure_success(response: Response, operation: &str) -> Result<Response, MapperError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }
        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, "{} request failed", operation);
        Err(MapperError::transport(format!(
            "{} failed with status {}: {}",
            operation, status, error_body
        )))
    }

    async fn write_response(response: Response) -> Result<WriteResponse, MapperError> {
        let status = response.status_code().as_u16();
        let body: Value = response.json().await?;
        parse_write_response(status, &body)
    }
}

#[async_trait]
impl SearchTransport for OpenSearchTransport {
    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<WriteResponse, MapperError> {
        let parts = match id {
            Some(id) => IndexParts::IndexId(index, id),
            None => IndexParts::Index(index),
        };

        let response = self.client.index(parts).body(document).send().await?;
        let response = Self::ensure_success(response, "Index").await?;
        let written = Self::write_response(response).await?;

        debug!(index, doc_id = %written.id, status = written.status, "Document indexed");
        Ok(written)
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<WriteResponse, MapperError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": document }))
            .send()
            .await?;
        let response = Self::ensure_success(response, "Update").await?;
        let written = Self::write_response(response).await?;

        debug!(index, doc_id = %id, result = ?written.result, "Document updated");
        Ok(written)
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<WriteResponse, MapperError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await?;

        // 404 is reported to the caller, not raised
        if response.status_code().as_u16() == 404 {
            debug!(index, doc_id = %id, "Document to delete not found");
            return Ok(WriteResponse {
                status: 404,
                id: id.to_string(),
                result: Some("not_found".to_string()),
            });
        }

        let response = Self::ensure_success(response, "Delete").await?;
        let written = Self::write_response(response).await?;

        debug!(index, doc_id = %id, "Document deleted");
        Ok(written)
    }

    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, MapperError> {
        let body: Vec<JsonBody<Value>> = Self::bulk_lines(operations)
            .into_iter()
            .map(JsonBody::new)
            .collect();
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await?;
        let response = Self::ensure_success(response, "Bulk").await?;

        let body: Value = response.json().await?;
        let parsed = parse_bulk_response(&body)?;

        debug!(
            index,
            items = parsed.items.len(),
            errors = parsed.errors,
            took_ms = parsed.took_ms,
            "Bulk request completed"
        );
        Ok(parsed)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, MapperError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await?;
        let response = Self::ensure_success(response, "Search").await?;

        let body: Value = response.json().await?;
        let parsed = parse_search_response(&body)?;

        debug!(index, hits = parsed.len(), total = parsed.total, "Search completed");
        Ok(parsed)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, MapperError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Self::ensure_success(response, "Index exists").await.map(|_| false),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<bool, MapperError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await?;
        let response = Self::ensure_success(response, "Create index").await?;

        let body: Value = response.json().await?;
        let acknowledged = body
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        info!(index, acknowledged, "Created index");
        Ok(acknowledged)
    }

    async fn delete_index(&self, index: &str) -> Result<bool, MapperError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;
        let response = Self::ensure_success(response, "Delete index").await?;

        let body: Value = response.json().await?;
        let acknowledged = body
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        info!(index, acknowledged, "Deleted index");
        Ok(acknowledged)
    }
}
