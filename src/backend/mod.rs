//! Search backend abstraction
//!
//! One synchronous round-trip per call. Implementations must be shareable
//! across stacking branches, hence `Send + Sync`. Retries and timeouts belong
//! to the implementation's transport, not to the engine.

pub mod http;

use crate::dsl::{SearchRequest, SearchResponse};
use crate::error::BackendError;

pub use http::HttpSearchBackend;

/// Executes search requests against an index
pub trait SearchBackend: Send + Sync {
    /// Run `request` and decode the response
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
}

impl<T: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        (**self).search(request)
    }
}
