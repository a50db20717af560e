//! Issue query and aggregation builder

use super::{Conditions, Unnest};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::{BoolQuery, Query};
use crate::filter::{IssueCalculation, IssueCriteria, IssueDimension, IssueFilter};

/// Index prefix; the tenant is appended
pub const INDEX_PREFIX: &str = "work_items_";

/// Field family marker
pub const FIELD_PREFIX: &str = "w_";

/// Bucket for issues without an assignee
pub const UNASSIGNED: &str = "_UNASSIGNED_";

pub(crate) const LABEL: Unnest = Unnest {
    path: "w_labels",
    field: "w_labels.name",
};

pub(crate) const COMPONENT: Unnest = Unnest {
    path: "w_components",
    field: "w_components.name",
};

/// Sub-aggregation names read back by the converter
pub mod metric {
    /// Story point total
    pub const STORY_POINTS: &str = "story_points";
    /// Age statistics
    pub const STATS: &str = "stats";
    /// Age median
    pub const MEDIAN: &str = "median";
}

const PARTIAL_MATCH_FIELDS: &[(&str, &str)] = &[
    ("project", "w_project"),
    ("summary", "w_summary"),
    ("key", "w_workitem_id"),
];

fn criteria_clauses(criteria: &IssueCriteria) -> Vec<Query> {
    let terms: [(&str, &[String]); 11] = [
        ("w_integration_id", &criteria.integration_ids),
        ("w_project", &criteria.projects),
        ("w_status", &criteria.statuses),
        ("w_status_category", &criteria.status_categories),
        ("w_priority", &criteria.priorities),
        ("w_workitem_type", &criteria.issue_types),
        ("w_assignee.id", &criteria.assignees),
        ("w_reporter.id", &criteria.reporters),
        ("w_epic", &criteria.epics),
        ("w_resolution", &criteria.resolutions),
        ("w_workitem_id", &criteria.keys),
    ];
    terms
        .iter()
        .filter_map(|(field, values)| crate::filter::terms_if_any(field, values))
        .chain(LABEL.terms_query(&criteria.labels))
        .chain(COMPONENT.terms_query(&criteria.components))
        .collect()
}

/// Boolean query for an issue filter
pub fn build_query(filter: &IssueFilter) -> BoolQuery {
    let mut conditions = Conditions::new();
    for clause in criteria_clauses(&filter.include) {
        conditions.must(Some(clause));
    }
    for clause in criteria_clauses(&filter.exclude) {
        conditions.must_not(Some(clause));
    }
    conditions
        .time_range("w_created_at", &filter.created_at)
        .time_range("w_updated_at", &filter.updated_at)
        .time_range("w_resolved_at", &filter.resolved_at)
        .value_range("w_story_points", &filter.story_points)
        .partial_matches(&filter.partial_match, PARTIAL_MATCH_FIELDS);
    conditions.build()
}

/// Keyword field behind a flat terms dimension
pub fn dimension_field(dim: IssueDimension) -> Option<&'static str> {
    match dim {
        IssueDimension::Project => Some("w_project"),
        IssueDimension::Status => Some("w_status"),
        IssueDimension::StatusCategory => Some("w_status_category"),
        IssueDimension::Priority => Some("w_priority"),
        IssueDimension::IssueType => Some("w_workitem_type"),
        IssueDimension::Assignee => Some("w_assignee.id"),
        IssueDimension::Reporter => Some("w_reporter.id"),
        IssueDimension::Epic => Some("w_epic"),
        IssueDimension::Resolution => Some("w_resolution"),
        _ => None,
    }
}

/// Date field behind a time dimension
pub fn time_field(dim: IssueDimension) -> Option<&'static str> {
    match dim {
        IssueDimension::IssueCreated | IssueDimension::Trend => Some("w_created_at"),
        IssueDimension::IssueUpdated => Some("w_updated_at"),
        IssueDimension::IssueResolved => Some("w_resolved_at"),
        _ => None,
    }
}

/// Nested source of an unnest dimension
pub fn unnest(dim: IssueDimension) -> Option<Unnest> {
    match dim {
        IssueDimension::Label => Some(LABEL),
        IssueDimension::Component => Some(COMPONENT),
        _ => None,
    }
}

/// Bucket aggregation for `across`, sized to `size` buckets
pub fn bucket_agg(filter: &IssueFilter, across: IssueDimension, size: usize) -> Aggregation {
    if let Some(field) = time_field(across) {
        return Aggregation::date_histogram(field, filter.grouping.interval);
    }
    if let Some(nested) = unnest(across) {
        return Aggregation::terms(nested.field, size);
    }
    let agg = Aggregation::terms(dimension_field(across).unwrap_or("w_project"), size);
    match across {
        IssueDimension::Assignee => agg.with_missing(UNASSIGNED),
        _ => agg,
    }
}

/// Metric sub-aggregations of a calculation
pub fn metric_aggs(calculation: IssueCalculation) -> AggregationMap {
    let mut aggs = AggregationMap::new();
    match calculation {
        IssueCalculation::TicketCount => {}
        IssueCalculation::StoryPoints => {
            aggs.insert(metric::STORY_POINTS.to_string(), Aggregation::sum("w_story_points"));
        }
        IssueCalculation::Age => {
            aggs.insert(metric::STATS.to_string(), Aggregation::stats("w_age"));
            aggs.insert(metric::MEDIAN.to_string(), Aggregation::median("w_age"));
        }
    }
    aggs
}

/// Metric a calculation sorts by; `None` sorts by document count
pub fn sort_metric(calculation: IssueCalculation) -> Option<&'static str> {
    match calculation {
        IssueCalculation::TicketCount => None,
        IssueCalculation::StoryPoints => Some(metric::STORY_POINTS),
        IssueCalculation::Age => Some("median[50.0]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimeRange, ValueRange};
    use serde_json::json;

    #[test]
    fn test_issue_query_fields() {
        let mut filter = IssueFilter::default();
        filter.include.priorities = vec!["P1".to_string()];
        filter.include.components = vec!["api".to_string()];
        filter.exclude.statuses = vec!["DONE".to_string()];
        filter.resolved_at = TimeRange::until(1_000);
        filter.story_points = ValueRange { gt: Some(2), lt: None };

        let q = build_query(&filter);
        assert_eq!(q.must.len(), 4);
        assert_eq!(q.must_not, vec![Query::terms("w_status", &["DONE"])]);
        assert!(q
            .must
            .contains(&Query::nested("w_components", Query::terms("w_components.name", &["api"]))));
    }

    #[test]
    fn test_assignee_bucket_has_missing() {
        let agg = bucket_agg(&IssueFilter::default(), IssueDimension::Assignee, 10).to_json();
        assert_eq!(agg, json!({ "terms": { "field": "w_assignee.id", "size": 10, "missing": "_UNASSIGNED_" } }));
    }

    #[test]
    fn test_age_metrics() {
        let aggs = metric_aggs(IssueCalculation::Age);
        assert_eq!(aggs[metric::STATS].to_json()["stats"]["field"], "w_age");
        assert!(metric_aggs(IssueCalculation::TicketCount).is_empty());
        assert_eq!(sort_metric(IssueCalculation::StoryPoints), Some("story_points"));
    }
}
