//! Search request envelope

use serde_json::{json, Map, Value};

use super::aggregation::{map_to_json, AggregationMap};
use super::query::BoolQuery;
use crate::types::SortDirection;

/// One `field -> order` sort clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Field or metric path
    pub field: String,
    /// Direction
    pub order: SortDirection,
}

impl SortField {
    /// Create a sort clause
    pub fn new(field: impl Into<String>, order: SortDirection) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Backend JSON representation
    pub fn to_json(&self) -> Value {
        let mut inner = Map::new();
        inner.insert(self.field.clone(), json!({ "order": self.order.as_str() }));
        Value::Object(inner)
    }
}

/// A single search round-trip: query, aggregations, hit window and sort
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index (`<prefix><tenant>`)
    pub index: String,
    /// Filter conditions
    pub query: BoolQuery,
    /// Named top-level aggregations
    pub aggs: AggregationMap,
    /// Hit offset
    pub from: usize,
    /// Hit page size; 0 for aggregation-only requests
    pub size: usize,
    /// Hit sort
    pub sort: Vec<SortField>,
    /// Exact total-hit tracking
    pub track_total_hits: bool,
}

impl SearchRequest {
    /// Request against `index` with no conditions, no aggregations and no hits
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: BoolQuery::default(),
            aggs: AggregationMap::new(),
            from: 0,
            size: 0,
            sort: Vec::new(),
            track_total_hits: true,
        }
    }

    /// Set the boolean query
    pub fn with_query(mut self, query: BoolQuery) -> Self {
        self.query = query;
        self
    }

    /// Set the aggregation tree
    pub fn with_aggs(mut self, aggs: AggregationMap) -> Self {
        self.aggs = aggs;
        self
    }

    /// Set the hit window
    pub fn with_window(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Append a hit sort clause
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Name of the single `across_*` aggregation, if the request has one
    pub fn across_name(&self) -> Option<&str> {
        self.aggs
            .keys()
            .find(|name| name.starts_with("across_"))
            .map(String::as_str)
    }

    /// JSON body posted to `/<index>/_search`
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        let query = if self.query.is_empty() {
            json!({ "match_all": {} })
        } else {
            serde_json::to_value(&self.query).unwrap_or_else(|_| json!({ "match_all": {} }))
        };
        body.insert("query".to_string(), query);
        if !self.aggs.is_empty() {
            body.insert("aggs".to_string(), map_to_json(&self.aggs));
        }
        body.insert("from".to_string(), Value::from(self.from));
        body.insert("size".to_string(), Value::from(self.size));
        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort.iter().map(SortField::to_json).collect()),
            );
        }
        body.insert("track_total_hits".to_string(), Value::from(self.track_total_hits));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::aggregation::Aggregation;
    use crate::dsl::query::Query;

    #[test]
    fn test_empty_query_becomes_match_all() {
        let body = SearchRequest::new("scm_commits_acme").body();
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["track_total_hits"], true);
        assert!(body.get("aggs").is_none());
    }

    #[test]
    fn test_body_carries_aggs_and_sort() {
        let mut aggs = AggregationMap::new();
        aggs.insert("across_author".to_string(), Aggregation::terms("c_author_id", 10));
        let request = SearchRequest::new("scm_commits_acme")
            .with_query(BoolQuery::from_conditions(vec![Query::terms("c_repo_id", &["r1"])], vec![]))
            .with_aggs(aggs)
            .with_sort(SortField::new("_doc", SortDirection::Desc));

        let body = request.body();
        assert_eq!(body["aggs"]["across_author"]["terms"]["field"], "c_author_id");
        assert_eq!(body["sort"], json!([{ "_doc": { "order": "desc" } }]));
        assert_eq!(request.across_name(), Some("across_author"));
    }
}
