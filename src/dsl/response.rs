//! Search response model
//!
//! Hits are decoded into typed structs; the aggregation tree stays raw JSON
//! and is navigated through [`AggregateView`], which never fails: missing
//! values read as `None` / zero.
//!
//! # Example
//!
//! ```rust
//! use scm_facets::dsl::response::SearchResponse;
//!
//! let raw = r#"{
//!   "hits": { "total": { "value": 10 }, "hits": [] },
//!   "aggregations": {
//!     "across_author": {
//!       "sum_other_doc_count": 0,
//!       "buckets": [ { "key": "alice", "doc_count": 5 } ]
//!     }
//!   }
//! }"#;
//! let response: SearchResponse = serde_json::from_str(raw).unwrap();
//! let across = response.aggregation("across_author").unwrap();
//! let bucket = &across.buckets()[0];
//! assert_eq!(bucket.key_string().as_deref(), Some("alice"));
//! assert_eq!(bucket.doc_count(), 5);
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Hit section
    #[serde(default)]
    pub hits: Hits,
    /// Raw aggregation results keyed by aggregation name
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

/// Hit section of a response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    /// Total hits
    #[serde(default)]
    pub total: Option<TotalHits>,
    /// Returned page of hits
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Exact or lower-bound total hit count
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TotalHits {
    /// Count
    pub value: u64,
}

/// One document hit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hit {
    /// Document id
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Stored document
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchResponse {
    /// Total hit count, zero when untracked
    pub fn total_hits(&self) -> u64 {
        self.hits.total.map(|t| t.value).unwrap_or(0)
    }

    /// View of a top-level aggregation
    pub fn aggregation(&self, name: &str) -> Option<AggregateView<'_>> {
        self.aggregations.get(name).map(AggregateView::new)
    }
}

/// Read-only view over one aggregation (or bucket) JSON object
#[derive(Debug, Clone, Copy)]
pub struct AggregateView<'a> {
    raw: &'a Value,
}

impl<'a> AggregateView<'a> {
    /// Wrap a raw JSON node
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    /// Underlying JSON
    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// Buckets in backend order. Keyed buckets (from `filters`) are returned
    /// in key order with the key injected.
    pub fn buckets(&self) -> Vec<Bucket<'a>> {
        match self.raw.get("buckets") {
            Some(Value::Array(items)) => items.iter().map(Bucket::new).collect(),
            Some(Value::Object(keyed)) => keyed
                .iter()
                .map(|(key, body)| Bucket::keyed(key.as_str(), body))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Named sub-aggregation
    pub fn sub(&self, name: &str) -> Option<AggregateView<'a>> {
        self.raw.get(name).filter(|v| v.is_object()).map(AggregateView::new)
    }

    /// `doc_count` of a single-bucket aggregation
    pub fn doc_count(&self) -> u64 {
        self.raw.get("doc_count").and_then(Value::as_u64).unwrap_or(0)
    }

    /// Documents in buckets beyond the requested window
    pub fn sum_other_doc_count(&self) -> u64 {
        self.raw
            .get("sum_other_doc_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// `value` of a single-value metric
    pub fn value(&self) -> Option<f64> {
        self.raw.get("value").and_then(Value::as_f64)
    }

    /// Percentile value; `percent` is looked up as `"50.0"` style keys
    pub fn percentile(&self, percent: f64) -> Option<f64> {
        let key = format!("{:.1}", percent);
        self.raw
            .get("values")
            .and_then(|values| values.get(&key))
            .and_then(Value::as_f64)
    }

    /// A field of a `stats` result (`min`, `max`, `avg`, `sum`, `count`)
    pub fn stat(&self, field: &str) -> Option<f64> {
        self.raw.get(field).and_then(Value::as_f64)
    }

    /// `value` of a single-value metric sub-aggregation
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.sub(name).and_then(|agg| agg.value())
    }

    /// Median of a percentiles sub-aggregation
    pub fn median(&self, name: &str) -> Option<f64> {
        self.sub(name).and_then(|agg| agg.percentile(50.0))
    }
}

/// One bucket of a multi-bucket aggregation
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    key: Option<Value>,
    body: AggregateView<'a>,
}

impl<'a> Bucket<'a> {
    fn new(raw: &'a Value) -> Self {
        Self {
            key: raw.get("key").cloned(),
            body: AggregateView::new(raw),
        }
    }

    fn keyed(key: &str, raw: &'a Value) -> Self {
        Self {
            key: Some(Value::from(key)),
            body: AggregateView::new(raw),
        }
    }

    /// Bucket key rendered as a string
    pub fn key_string(&self) -> Option<String> {
        match self.key.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric bucket key (date histogram millis)
    pub fn key_i64(&self) -> Option<i64> {
        match self.key.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// `key_as_string`, present on date buckets
    pub fn key_as_string(&self) -> Option<&'a str> {
        self.body.raw().get("key_as_string").and_then(Value::as_str)
    }

    /// Document count
    pub fn doc_count(&self) -> u64 {
        self.body.doc_count()
    }

    /// The bucket body as an aggregation view
    pub fn view(&self) -> AggregateView<'a> {
        self.body
    }

    /// Named sub-aggregation
    pub fn sub(&self, name: &str) -> Option<AggregateView<'a>> {
        self.body.sub(name)
    }

    /// `value` of a single-value metric sub-aggregation
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.body.metric(name)
    }

    /// Median of a percentiles sub-aggregation
    pub fn median(&self, name: &str) -> Option<f64> {
        self.body.median(name)
    }
}
