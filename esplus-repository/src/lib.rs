//! # esplus Repository
//!
//! This crate turns condition lists into boolean search queries and manages
//! the lifecycle of typed documents in a search index. It includes the error
//! type, the transport interface with a concrete OpenSearch implementation,
//! the query compiler, the document codec, batched writes and the
//! `DocumentMapper` facade tying them together.

pub mod bulk;
pub mod codec;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mapper;
pub mod metadata;
pub mod opensearch;
pub mod query;
pub mod types;
pub mod utils;

pub use bulk::BulkExecutor;
pub use codec::DocumentCodec;
pub use config::MapperConfig;
pub use errors::MapperError;
pub use interfaces::SearchTransport;
pub use mapper::DocumentMapper;
pub use metadata::MetadataRegistry;
pub use opensearch::{IndexDefinition, OpenSearchTransport};
pub use query::{BoolQuery, QueryFragment, QueryTreeCompiler, QueryTypeDispatcher, SearchRequestBuilder};
pub use types::{
    BatchOperationResult, BatchOperationSummary, BatchPolicy, BulkAction, BulkItemResponse,
    BulkOperation, BulkResponse, UpdateSet, WriteOutcome, WriteResponse,
};
pub use utils::require_id;
