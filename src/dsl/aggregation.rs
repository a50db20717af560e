//! Aggregation tree model
//!
//! Bucket aggregations (`terms`, `date_histogram`, `nested`, `filter`,
//! keyed `filters`, `reverse_nested`) carry named sub-aggregations; metric
//! aggregations are leaves. The tree serializes to the backend's JSON shape.
//!
//! # Example
//!
//! ```rust
//! use scm_facets::dsl::aggregation::Aggregation;
//!
//! let agg = Aggregation::terms("c_author_id", 10)
//!     .with_sub("files_ct", Aggregation::sum("c_files_ct"))
//!     .with_sub("pct", Aggregation::median("c_tot_lines_changed"));
//!
//! let json = agg.to_json();
//! assert_eq!(json["terms"]["field"], "c_author_id");
//! assert!(json["aggs"]["pct"]["percentiles"].is_object());
//! ```

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::query::Query;
use super::request::SortField;
use crate::types::{AggInterval, SortDirection};

/// Named aggregations, ordered by name for deterministic requests
pub type AggregationMap = BTreeMap<String, Aggregation>;

/// Aggregation node: a kind plus optional named children
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// What this node computes
    pub kind: AggregationKind,
    /// Sub-aggregations evaluated per bucket
    pub aggs: AggregationMap,
}

/// Source of a `terms` aggregation's keys
#[derive(Debug, Clone, PartialEq)]
pub enum TermsSource {
    /// Document field
    Field(String),
    /// Inline script producing the key
    Script(String),
}

/// Aggregation kinds the engine emits
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// One bucket per distinct value
    Terms {
        /// Field or script
        source: TermsSource,
        /// Maximum buckets returned
        size: usize,
        /// Bucket for documents without a value
        missing: Option<String>,
        /// Drop buckets below this count
        min_doc_count: Option<u64>,
        /// Bucket ordering, e.g. `("_key", Asc)`
        order: Option<(String, SortDirection)>,
    },
    /// One bucket per calendar interval
    DateHistogram {
        /// Date field (epoch millis)
        field: String,
        /// Calendar interval
        interval: AggInterval,
        /// Drop empty buckets below this count
        min_doc_count: u64,
    },
    /// Step into nested objects
    Nested {
        /// Nested path
        path: String,
    },
    /// Step back to the root document from a nested context
    ReverseNested,
    /// Single bucket of documents matching a query
    Filter(Query),
    /// Keyed buckets, one per named query
    Filters(Vec<(String, Query)>),
    /// Approximate distinct count
    Cardinality {
        /// Field name
        field: String,
    },
    /// Sum of a field
    Sum {
        /// Field name
        field: String,
    },
    /// Average of a field
    Avg {
        /// Field name
        field: String,
    },
    /// min / max / avg / sum / count of a field
    Stats {
        /// Field name
        field: String,
        /// Value used for documents without one
        missing: Option<i64>,
    },
    /// Percentiles of a field
    Percentiles {
        /// Field name
        field: String,
        /// Requested percents
        percents: Vec<f64>,
    },
    /// Pipeline: sort and truncate the parent's buckets
    BucketSort {
        /// Offset
        from: usize,
        /// Page size
        size: usize,
        /// Optional metric ordering
        sort: Vec<SortField>,
    },
}

impl Aggregation {
    fn leaf(kind: AggregationKind) -> Self {
        Self {
            kind,
            aggs: AggregationMap::new(),
        }
    }

    /// `terms` on a field
    pub fn terms(field: impl Into<String>, size: usize) -> Self {
        Self::leaf(AggregationKind::Terms {
            source: TermsSource::Field(field.into()),
            size,
            missing: None,
            min_doc_count: None,
            order: None,
        })
    }

    /// `terms` on a script value
    pub fn script_terms(script: impl Into<String>, size: usize) -> Self {
        Self::leaf(AggregationKind::Terms {
            source: TermsSource::Script(script.into()),
            size,
            missing: None,
            min_doc_count: None,
            order: None,
        })
    }

    /// `date_histogram` with `min_doc_count: 1`
    pub fn date_histogram(field: impl Into<String>, interval: AggInterval) -> Self {
        Self::leaf(AggregationKind::DateHistogram {
            field: field.into(),
            interval,
            min_doc_count: 1,
        })
    }

    /// `nested`
    pub fn nested(path: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Nested { path: path.into() })
    }

    /// `reverse_nested`
    pub fn reverse_nested() -> Self {
        Self::leaf(AggregationKind::ReverseNested)
    }

    /// `filter`
    pub fn filter(query: Query) -> Self {
        Self::leaf(AggregationKind::Filter(query))
    }

    /// Keyed `filters`
    pub fn filters(named: Vec<(String, Query)>) -> Self {
        Self::leaf(AggregationKind::Filters(named))
    }

    /// `cardinality`
    pub fn cardinality(field: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Cardinality { field: field.into() })
    }

    /// `sum`
    pub fn sum(field: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Sum { field: field.into() })
    }

    /// `avg`
    pub fn avg(field: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Avg { field: field.into() })
    }

    /// `stats` with missing values counted as zero
    pub fn stats(field: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Stats {
            field: field.into(),
            missing: Some(0),
        })
    }

    /// 50th percentile
    pub fn median(field: impl Into<String>) -> Self {
        Self::leaf(AggregationKind::Percentiles {
            field: field.into(),
            percents: vec![50.0],
        })
    }

    /// `bucket_sort` pipeline
    pub fn bucket_sort(from: usize, size: usize, sort: Vec<SortField>) -> Self {
        Self::leaf(AggregationKind::BucketSort { from, size, sort })
    }

    /// Attach a named sub-aggregation
    pub fn with_sub(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggs.insert(name.into(), agg);
        self
    }

    /// Attach every entry of `subs`
    pub fn with_subs(mut self, subs: AggregationMap) -> Self {
        self.aggs.extend(subs);
        self
    }

    /// Set `missing` on a `terms` node; no-op for other kinds
    pub fn with_missing(mut self, value: impl Into<String>) -> Self {
        if let AggregationKind::Terms { missing, .. } = &mut self.kind {
            *missing = Some(value.into());
        }
        self
    }

    /// Set `min_doc_count` on a `terms` node; no-op for other kinds
    pub fn with_min_doc_count(mut self, count: u64) -> Self {
        if let AggregationKind::Terms { min_doc_count, .. } = &mut self.kind {
            *min_doc_count = Some(count);
        }
        self
    }

    /// Set the bucket order on a `terms` node; no-op for other kinds
    pub fn with_order(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        if let AggregationKind::Terms { order, .. } = &mut self.kind {
            *order = Some((key.into(), direction));
        }
        self
    }

    /// Backend JSON representation
    pub fn to_json(&self) -> Value {
        let (name, body) = self.kind.to_json();
        let mut node = Map::new();
        node.insert(name.to_string(), body);
        if !self.aggs.is_empty() {
            node.insert("aggs".to_string(), map_to_json(&self.aggs));
        }
        Value::Object(node)
    }
}

impl AggregationKind {
    fn to_json(&self) -> (&'static str, Value) {
        match self {
            AggregationKind::Terms {
                source,
                size,
                missing,
                min_doc_count,
                order,
            } => {
                let mut body = Map::new();
                match source {
                    TermsSource::Field(field) => {
                        body.insert("field".to_string(), Value::from(field.as_str()));
                    }
                    TermsSource::Script(script) => {
                        body.insert("script".to_string(), json!({ "source": script, "lang": "painless" }));
                    }
                }
                body.insert("size".to_string(), Value::from(*size));
                if let Some(m) = missing {
                    body.insert("missing".to_string(), Value::from(m.as_str()));
                }
                if let Some(c) = min_doc_count {
                    body.insert("min_doc_count".to_string(), Value::from(*c));
                }
                if let Some((key, dir)) = order {
                    body.insert("order".to_string(), json!({ key: dir.as_str() }));
                }
                ("terms", Value::Object(body))
            }
            AggregationKind::DateHistogram {
                field,
                interval,
                min_doc_count,
            } => (
                "date_histogram",
                json!({
                    "field": field,
                    "calendar_interval": interval.calendar_interval(),
                    "time_zone": "UTC",
                    "min_doc_count": min_doc_count,
                }),
            ),
            AggregationKind::Nested { path } => ("nested", json!({ "path": path })),
            AggregationKind::ReverseNested => ("reverse_nested", json!({})),
            AggregationKind::Filter(query) => ("filter", query.to_json()),
            AggregationKind::Filters(named) => {
                let mut filters = Map::new();
                for (key, query) in named {
                    filters.insert(key.clone(), query.to_json());
                }
                ("filters", json!({ "filters": filters }))
            }
            AggregationKind::Cardinality { field } => ("cardinality", json!({ "field": field })),
            AggregationKind::Sum { field } => ("sum", json!({ "field": field })),
            AggregationKind::Avg { field } => ("avg", json!({ "field": field })),
            AggregationKind::Stats { field, missing } => match missing {
                Some(m) => ("stats", json!({ "field": field, "missing": m })),
                None => ("stats", json!({ "field": field })),
            },
            AggregationKind::Percentiles { field, percents } => {
                ("percentiles", json!({ "field": field, "percents": percents }))
            }
            AggregationKind::BucketSort { from, size, sort } => {
                let mut body = Map::new();
                body.insert("from".to_string(), Value::from(*from));
                body.insert("size".to_string(), Value::from(*size));
                if !sort.is_empty() {
                    body.insert(
                        "sort".to_string(),
                        Value::Array(sort.iter().map(SortField::to_json).collect()),
                    );
                }
                ("bucket_sort", Value::Object(body))
            }
        }
    }
}

/// Serialize a named aggregation map
pub fn map_to_json(aggs: &AggregationMap) -> Value {
    let mut out = Map::new();
    for (name, agg) in aggs {
        out.insert(name.clone(), agg.to_json());
    }
    Value::Object(out)
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
