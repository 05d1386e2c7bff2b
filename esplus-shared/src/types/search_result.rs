//! Search result types for the document mapper.
//!
//! This module defines the response structures returned from search operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// The backend document identifier.
    pub id: String,

    /// Relevance score from the search engine, absent when sorting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// The stored document source. `Null` when source was not fetched.
    #[serde(default)]
    pub source: Value,

    /// Highlighted fragments keyed by field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

/// Complete search response with hits and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    /// The returned hits, in backend order.
    pub hits: Vec<SearchHit>,

    /// Total number of matching documents.
    /// May be greater than the number of returned hits due to pagination.
    pub total: u64,

    /// Time taken to execute the search in milliseconds.
    pub took_ms: u64,

    /// Raw aggregation results keyed by aggregation name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

impl SearchResponse {
    /// Create an empty search response.
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total: 0,
            took_ms: 0,
            aggregations: None,
        }
    }

    /// Create a new search response.
    pub fn new(hits: Vec<SearchHit>, total: u64, took_ms: u64) -> Self {
        Self {
            hits,
            total,
            took_ms,
            aggregations: None,
        }
    }

    /// Returns true if there are no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns the number of hits in this response.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Identifiers of the returned hits, in order.
    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }
}
