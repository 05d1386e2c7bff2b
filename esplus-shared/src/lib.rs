//! # Esplus Shared
//!
//! This crate defines the data structures shared between callers and the esplus
//! repository crate: predicates and condition lists, search directives, search
//! responses and the per-type document metadata consumed by the document codec.

pub mod types;

pub use types::condition::{
    ClauseKind, ConditionEntry, ConditionList, FieldValuePredicate, GroupMarker, OperatorKind,
    PredicateValue,
};
pub use types::document::{
    Document, DocumentMetadata, FieldDescriptor, FieldKind, FieldStrategy, IdType,
};
pub use types::search_query::{
    AggregationDirective, AggregationKind, GeoDirective, GeoPoint, GeoShape, HighlightDirective,
    SearchQuery, ShapeRelation, SortDirective, DEFAULT_SIZE,
};
pub use types::search_result::{SearchHit, SearchResponse};
