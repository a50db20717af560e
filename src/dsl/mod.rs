//! Search backend DSL
//!
//! The subset of the Elasticsearch-compatible query language the engine needs:
//!
//! ```text
//! SearchRequest
//!   ├── query: BoolQuery { must, must_not, should }
//!   ├── aggs:  across_<dim> ─┬─ metric sub-aggregations
//!   │                        └─ nested / filter / bucket_sort children
//!   ├── from / size / sort
//!   └── track_total_hits
//!
//! SearchResponse
//!   ├── hits.total.value, hits[]._source
//!   └── aggregations ── AggregateView ── Bucket
//! ```

pub mod aggregation;
pub mod query;
pub mod request;
pub mod response;

pub use aggregation::{Aggregation, AggregationKind, AggregationMap, TermsSource};
pub use query::{BoolQuery, Query, RangeQuery};
pub use request::{SearchRequest, SortField};
pub use response::{AggregateView, Bucket, Hit, SearchResponse};
