//! Interface definitions for the search backend transport.
//!
//! This module defines the abstract `SearchTransport` trait that allows
//! for dependency injection and swappable backend implementations.

mod search_transport;

pub use search_transport::SearchTransport;
