//! Boolean query compilation.
//!
//! This module turns a flat [`ConditionList`](esplus_shared::ConditionList)
//! into a nested boolean query and assembles the full search request body
//! around it.

mod compiler;
mod dispatcher;
mod fragment;
mod request;

pub use compiler::QueryTreeCompiler;
pub use dispatcher::QueryTypeDispatcher;
pub use fragment::{BoolQuery, Occur, QueryFragment};
pub use request::SearchRequestBuilder;
