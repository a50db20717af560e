//! Response conversion
//!
//! Turns backend responses into [`AggregationResult`](crate::result::AggregationResult)
//! rows (one per bucket) and list records (one per hit).

pub mod commit;
pub mod issue;
pub mod list;
pub mod pull_request;

pub use list::{decode_hits, millis_to_secs, percentage, LineBreakdown};

/// Integral view of a sum metric
pub(crate) fn as_count(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.round() as i64)
}
