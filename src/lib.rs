//! SCM Facets - stacked faceted aggregation over commits, pull requests and issues
//!
//! This library turns a typed filter into one search-backend aggregation
//! request and the response back into normalized rows:
//! - Group-by on any dimension of a document kind, with per-bucket metrics
//! - One level of drill-down ("stacking") fanned out on a bounded worker pool
//! - Organizational-unit scoping resolved against a relational store
//! - Identity translation through a per-tenant LRU cache
//! - Per-document listings with derived line metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support and environment overrides
pub mod config;

/// Tracing subscriber setup
pub mod logging;

/// Search backend request / response model
pub mod dsl;

/// Filter models, dimensions and calculations per document kind
pub mod filter;

/// Organizational-unit scoping
pub mod ou;

/// Per-tenant identity translation cache
pub mod identity;

/// Relational identity and OU store
pub mod store;

/// Search backend transport
pub mod backend;

/// Query and aggregation builders per document kind
pub mod builder;

/// Group-by and list sort resolution
pub mod sort;

/// Result rows and list records
pub mod result;

/// Response to row / record conversion
pub mod convert;

/// Group-by, stacking and collaboration executors
pub mod engine;

/// Caller-facing facades per document kind
pub mod services;

// Re-export main types
pub use config::EngineConfig;
pub use engine::{EngineContext, FacetKind};
pub use error::{Error, ErrorClass, Result};
pub use ou::{OuConfig, OuRole};
pub use result::{AggregationResult, ListResponse};
pub use services::{CommitFacets, IssueFacets, PullRequestFacets};
pub use types::{PageWindow, SortDirection, SortSpec, TimeRange};
