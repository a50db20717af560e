//! Query and aggregation condition builders
//!
//! Each document kind turns its filter into
//!
//! - a boolean query: one `must` clause per populated include field or time
//!   range, one `must_not` clause per populated exclude field
//! - a bucket aggregation for the `across` dimension
//! - the metric sub-aggregations of the selected calculation
//!
//! All functions are pure. Empty include / exclude lists and unbounded time
//! ranges produce no clause at all.

pub mod commit;
pub mod issue;
pub mod pull_request;

use crate::dsl::aggregation::Aggregation;
use crate::dsl::query::{BoolQuery, Query};
use crate::filter::{PartialMatches, SizeThresholds};
use crate::types::{TimeRange, ValueRange};

/// Nested ("unnest") bucket source for array-of-object fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unnest {
    /// Nested path
    pub path: &'static str,
    /// Keyword field inside the nested object
    pub field: &'static str,
}

/// Name of the reverse-nested child that re-counts parent documents
pub const UNNEST_DOCS: &str = "docs";

impl Unnest {
    /// `nested` query matching any of `values`
    pub fn terms_query(&self, values: &[String]) -> Option<Query> {
        if values.is_empty() {
            return None;
        }
        Some(Query::nested(self.path, Query::terms(self.field, values)))
    }
}

/// Request-independent inputs of the builders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildParams {
    /// Reference time, epoch seconds
    pub now_secs: i64,
    /// Days before `now_secs` separating refactored from legacy lines
    pub legacy_window_days: i64,
}

impl BuildParams {
    /// Parameters anchored at the current time
    pub fn now(legacy_window_days: i64) -> Self {
        Self {
            now_secs: chrono::Utc::now().timestamp(),
            legacy_window_days,
        }
    }

    /// Legacy cutoff in epoch seconds, unless the filter overrides it
    pub fn legacy_cutoff(&self, filter_override: Option<i64>) -> i64 {
        filter_override.unwrap_or_else(|| self.now_secs - self.legacy_window_days * 86_400)
    }
}

/// Accumulates `must` / `must_not` clauses
#[derive(Debug, Default)]
pub struct Conditions {
    must: Vec<Query>,
    must_not: Vec<Query>,
}

impl Conditions {
    /// Empty condition set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include clause
    pub fn must(&mut self, query: Option<Query>) -> &mut Self {
        if let Some(q) = query {
            self.must.push(q);
        }
        self
    }

    /// Add an exclude clause
    pub fn must_not(&mut self, query: Option<Query>) -> &mut Self {
        if let Some(q) = query {
            self.must_not.push(q);
        }
        self
    }

    /// Add a `terms` include clause when `values` is populated
    pub fn include_terms(&mut self, field: &str, values: &[String]) -> &mut Self {
        self.must(crate::filter::terms_if_any(field, values))
    }

    /// Add a `terms` exclude clause when `values` is populated
    pub fn exclude_terms(&mut self, field: &str, values: &[String]) -> &mut Self {
        self.must_not(crate::filter::terms_if_any(field, values))
    }

    /// Add a `[start, end)` range over an epoch-millis field
    pub fn time_range(&mut self, field: &str, range: &TimeRange) -> &mut Self {
        let (start, end) = range.to_millis();
        self.must(Query::time_range(field, start, end))
    }

    /// Add an exclusive numeric range
    pub fn value_range(&mut self, field: &str, range: &ValueRange) -> &mut Self {
        self.must(Query::exclusive_range(field, range.gt, range.lt))
    }

    /// Add wildcard clauses for partial matches. `fields` maps the
    /// filter-facing name to the index field; unknown names are ignored.
    pub fn partial_matches(&mut self, matches: &PartialMatches, fields: &[(&str, &str)]) -> &mut Self {
        for (name, pm) in matches {
            if let Some((_, field)) = fields.iter().find(|(n, _)| n == name) {
                self.must.extend(pm.wildcards(field));
            }
        }
        self
    }

    /// Finish into a boolean query
    pub fn build(self) -> BoolQuery {
        BoolQuery::from_conditions(self.must, self.must_not)
    }
}

/// Three named size bands over `field`, as keyed `filters` buckets
pub fn size_band_agg(field: &str, names: [&str; 3], thresholds: &SizeThresholds) -> Aggregation {
    let named = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let (gt, lte) = thresholds.band(i);
            (name.to_string(), Query::band(field, gt, lte))
        })
        .collect();
    Aggregation::filters(named)
}

/// `should` over the requested size bands; `None` when no known band is named
pub fn size_band_query(
    field: &str,
    names: [&str; 3],
    thresholds: &SizeThresholds,
    requested: &[String],
) -> Option<Query> {
    let clauses: Vec<Query> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| requested.iter().any(|r| r == *name))
        .map(|(i, _)| {
            let (gt, lte) = thresholds.band(i);
            Query::band(field, gt, lte)
        })
        .collect();
    if clauses.is_empty() {
        None
    } else {
        Some(Query::any_of(clauses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PartialMatch;
    use serde_json::json;

    #[test]
    fn test_empty_conditions() {
        let mut c = Conditions::new();
        c.include_terms("c_repo_id", &[])
            .exclude_terms("c_author_id", &[])
            .time_range("c_committed_at", &TimeRange::default())
            .value_range("c_loc", &ValueRange::default());
        assert!(c.build().is_empty());
    }

    #[test]
    fn test_partial_match_field_mapping() {
        let mut matches = PartialMatches::new();
        matches.insert(
            "repo_id".to_string(),
            PartialMatch {
                begins: Some("svc".to_string()),
                ..Default::default()
            },
        );
        matches.insert("unknown".to_string(), PartialMatch::default());

        let mut c = Conditions::new();
        c.partial_matches(&matches, &[("repo_id", "c_repo_id")]);
        let q = c.build();
        assert_eq!(q.must, vec![Query::wildcard("c_repo_id", "svc*")]);
    }

    #[test]
    fn test_size_band_query_selects_requested() {
        let q = size_band_query(
            "pr_comment_count",
            ["shallow", "good", "heavy"],
            &SizeThresholds::default(),
            &["heavy".to_string()],
        )
        .unwrap();
        assert_eq!(
            q.to_json(),
            json!({ "bool": { "should": [ { "range": { "pr_comment_count": { "gt": 1000 } } } ], "minimum_should_match": 1 } })
        );
        assert!(size_band_query("f", ["a", "b", "c"], &SizeThresholds::default(), &["zzz".to_string()]).is_none());
    }

    #[test]
    fn test_size_band_agg_is_keyed() {
        let agg = size_band_agg("c_tot_lines_changed", ["small", "medium", "large"], &SizeThresholds::default());
        let json = agg.to_json();
        assert_eq!(json["filters"]["filters"]["small"], json!({ "range": { "c_tot_lines_changed": { "lte": 100 } } }));
    }
}
