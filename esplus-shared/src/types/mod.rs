//! This module defines the core data structures used across the esplus crates.
//! It re-exports the condition, directive, metadata and response types.

pub mod condition;
pub mod document;
pub mod search_query;
pub mod search_result;

pub use condition::{ConditionList, FieldValuePredicate};
pub use document::{Document, DocumentMetadata};
pub use search_query::SearchQuery;
pub use search_result::SearchResponse;
