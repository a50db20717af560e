//! Boolean query model
//!
//! Covers the subset of the search DSL the engine emits: term-level
//! queries, ranges, wildcards, nested queries and the boolean compound.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A single query clause
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document
    MatchAll,
    /// Exact match on one value
    Term {
        /// Field name
        field: String,
        /// Value
        value: Value,
    },
    /// Exact match on any of several values
    Terms {
        /// Field name
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// Range on a numeric or date field
    Range(RangeQuery),
    /// Field has a value
    Exists {
        /// Field name
        field: String,
    },
    /// Glob match (`*` and `?`)
    Wildcard {
        /// Field name
        field: String,
        /// Pattern
        pattern: String,
    },
    /// Query evaluated against nested objects at `path`
    Nested {
        /// Nested object path
        path: String,
        /// Inner query
        query: Box<Query>,
    },
    /// Boolean compound
    Bool(BoolQuery),
}

/// Range bounds for a single field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeQuery {
    /// Field name
    pub field: String,
    /// Exclusive lower bound
    pub gt: Option<Value>,
    /// Inclusive lower bound
    pub gte: Option<Value>,
    /// Exclusive upper bound
    pub lt: Option<Value>,
    /// Inclusive upper bound
    pub lte: Option<Value>,
    /// Time zone for date fields
    pub time_zone: Option<String>,
}

/// Boolean compound query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    /// Clauses that must all match
    pub must: Vec<Query>,
    /// Clauses that must not match
    pub must_not: Vec<Query>,
    /// Clauses of which at least `minimum_should_match` must match
    pub should: Vec<Query>,
    /// Minimum number of `should` clauses
    pub minimum_should_match: Option<u32>,
}

impl Query {
    /// `term` query
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `terms` query over string values
    pub fn terms<S: AsRef<str>>(field: impl Into<String>, values: &[S]) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.iter().map(|v| Value::from(v.as_ref())).collect(),
        }
    }

    /// `exists` query
    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    /// `wildcard` query
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Query::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// `nested` query
    pub fn nested(path: impl Into<String>, query: Query) -> Self {
        Query::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    /// Range over epoch-millisecond bounds: `gte start`, `lt end`, UTC.
    ///
    /// Returns `None` when both bounds are absent.
    pub fn time_range(field: impl Into<String>, start_ms: Option<i64>, end_ms: Option<i64>) -> Option<Self> {
        if start_ms.is_none() && end_ms.is_none() {
            return None;
        }
        Some(Query::Range(RangeQuery {
            field: field.into(),
            gte: start_ms.map(Value::from),
            lt: end_ms.map(Value::from),
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        }))
    }

    /// Range with exclusive numeric bounds. `None` when both are absent.
    pub fn exclusive_range(field: impl Into<String>, gt: Option<i64>, lt: Option<i64>) -> Option<Self> {
        if gt.is_none() && lt.is_none() {
            return None;
        }
        Some(Query::Range(RangeQuery {
            field: field.into(),
            gt: gt.map(Value::from),
            lt: lt.map(Value::from),
            ..Default::default()
        }))
    }

    /// Half-open numeric range `[gte, lt)`
    pub fn half_open(field: impl Into<String>, gte: Option<i64>, lt: Option<i64>) -> Self {
        Query::Range(RangeQuery {
            field: field.into(),
            gte: gte.map(Value::from),
            lt: lt.map(Value::from),
            ..Default::default()
        })
    }

    /// Size band `(gt, lte]`, used for small / medium / large style buckets
    pub fn band(field: impl Into<String>, gt: Option<i64>, lte: Option<i64>) -> Self {
        Query::Range(RangeQuery {
            field: field.into(),
            gt: gt.map(Value::from),
            lte: lte.map(Value::from),
            ..Default::default()
        })
    }

    /// Field must be absent
    pub fn missing(field: impl Into<String>) -> Self {
        Query::Bool(BoolQuery {
            must_not: vec![Query::exists(field)],
            ..Default::default()
        })
    }

    /// At least one of `clauses` must match
    pub fn any_of(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            should: clauses,
            minimum_should_match: Some(1),
            ..Default::default()
        })
    }

    /// Backend JSON representation
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Term { field, value } => json!({ "term": { field: { "value": value } } }),
            Query::Terms { field, values } => json!({ "terms": { field: values } }),
            Query::Range(range) => range.to_json(),
            Query::Exists { field } => json!({ "exists": { "field": field } }),
            Query::Wildcard { field, pattern } => {
                json!({ "wildcard": { field: { "value": pattern } } })
            }
            Query::Nested { path, query } => {
                json!({ "nested": { "path": path, "query": query.to_json() } })
            }
            Query::Bool(b) => b.to_json(),
        }
    }
}

impl RangeQuery {
    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        let pairs = [("gt", &self.gt), ("gte", &self.gte), ("lt", &self.lt), ("lte", &self.lte)];
        for (name, bound) in pairs {
            if let Some(v) = bound {
                bounds.insert(name.to_string(), v.clone());
            }
        }
        if let Some(tz) = &self.time_zone {
            bounds.insert("time_zone".to_string(), Value::from(tz.as_str()));
        }
        let mut range = Map::new();
        range.insert(self.field.clone(), Value::Object(bounds));
        json!({ "range": range })
    }
}

impl BoolQuery {
    /// Compound from include and exclude clause lists
    pub fn from_conditions(must: Vec<Query>, must_not: Vec<Query>) -> Self {
        Self {
            must,
            must_not,
            ..Default::default()
        }
    }

    /// True when no clause is present
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    fn to_json(&self) -> Value {
        let clauses = |list: &[Query]| Value::Array(list.iter().map(Query::to_json).collect());
        let mut body = Map::new();
        if !self.must.is_empty() {
            body.insert("must".to_string(), clauses(&self.must));
        }
        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), clauses(&self.must_not));
        }
        if !self.should.is_empty() {
            body.insert("should".to_string(), clauses(&self.should));
        }
        if let Some(n) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), Value::from(n));
        }
        json!({ "bool": body })
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for BoolQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_query_json() {
        let q = Query::terms("c_author_id", &["a1", "a2"]);
        assert_eq!(q.to_json(), json!({ "terms": { "c_author_id": ["a1", "a2"] } }));
    }

    #[test]
    fn test_time_range_omitted_without_bounds() {
        assert!(Query::time_range("c_committed_at", None, None).is_none());

        let q = Query::time_range("c_committed_at", Some(1000), None).unwrap();
        assert_eq!(
            q.to_json(),
            json!({ "range": { "c_committed_at": { "gte": 1000, "time_zone": "UTC" } } })
        );
    }

    #[test]
    fn test_bool_query_skips_empty_lists() {
        let q = Query::Bool(BoolQuery::from_conditions(vec![Query::exists("pr_id")], vec![]));
        assert_eq!(
            q.to_json(),
            json!({ "bool": { "must": [ { "exists": { "field": "pr_id" } } ] } })
        );
    }

    #[test]
    fn test_nested_wildcard() {
        let q = Query::nested("c_technologies", Query::wildcard("c_technologies.name", "Ja*"));
        assert_eq!(
            q.to_json(),
            json!({ "nested": { "path": "c_technologies", "query": { "wildcard": { "c_technologies.name": { "value": "Ja*" } } } } })
        );
    }
}
