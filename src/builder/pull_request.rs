//! Pull request query and aggregation builder

use super::{size_band_agg, size_band_query, Conditions, Unnest};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::{BoolQuery, Query};
use crate::filter::{PrCalculation, PrCriteria, PrDimension, PrFilter};
use crate::types::SortSpec;

/// Index prefix; the tenant is appended
pub const INDEX_PREFIX: &str = "scm_prs_";

/// Field family marker
pub const FIELD_PREFIX: &str = "pr_";

/// Code change bucket names, smallest first
pub const CODE_CHANGE_BANDS: [&str; 3] = ["small", "medium", "large"];

/// Comment density bucket names, lightest first
pub const COMMENT_DENSITY_BANDS: [&str; 3] = ["shallow", "good", "heavy"];

pub(crate) const LABEL: Unnest = Unnest {
    path: "pr_labels",
    field: "pr_labels.name",
};

/// Sub-aggregation names read back by the converter
pub mod metric {
    /// Distinct pull requests
    pub const PR_COUNT: &str = "pr_count";
    /// Lines added
    pub const ADDITIONS: &str = "additions";
    /// Lines removed
    pub const DELETIONS: &str = "deletions";
    /// Lines changed
    pub const CHANGES: &str = "changes";
    /// Files changed
    pub const FILES: &str = "files_ct";
    /// Comments
    pub const COMMENTS: &str = "comment_ct";
    /// Duration statistics
    pub const STATS: &str = "stats";
    /// Duration median
    pub const MEDIAN: &str = "median";
}

const PARTIAL_MATCH_FIELDS: &[(&str, &str)] = &[
    ("repo_id", "pr_repo_id"),
    ("project", "pr_project"),
    ("source_branch", "pr_source_branch"),
    ("target_branch", "pr_target_branch"),
    ("title", "pr_title"),
];

fn criteria_clauses(filter: &PrFilter, criteria: &PrCriteria) -> Vec<Query> {
    let terms: [(&str, &[String]); 13] = [
        ("pr_integration_id", &criteria.integration_ids),
        ("pr_repo_id", &criteria.repo_ids),
        ("pr_project", &criteria.projects),
        ("pr_source_branch", &criteria.source_branches),
        ("pr_target_branch", &criteria.target_branches),
        ("pr_state", &criteria.states),
        ("pr_creator_id", &criteria.creators),
        ("pr_assignee_ids", &criteria.assignees),
        ("pr_reviewer_ids", &criteria.reviewers),
        ("pr_approver_ids", &criteria.approvers),
        ("pr_collab_state", &criteria.collab_states),
        ("pr_review_type", &criteria.review_types),
        ("pr_approval_status", &criteria.approval_statuses),
    ];
    terms
        .iter()
        .filter_map(|(field, values)| crate::filter::terms_if_any(field, values))
        .chain(LABEL.terms_query(&criteria.labels))
        .chain(size_band_query(
            "pr_changes",
            CODE_CHANGE_BANDS,
            &filter.code_change_size,
            &criteria.code_changes,
        ))
        .chain(size_band_query(
            "pr_comment_count",
            COMMENT_DENSITY_BANDS,
            &filter.comment_density_size,
            &criteria.comment_densities,
        ))
        .collect()
}

/// Boolean query for a pull request filter
pub fn build_query(filter: &PrFilter) -> BoolQuery {
    let mut conditions = Conditions::new();
    for clause in criteria_clauses(filter, &filter.include) {
        conditions.must(Some(clause));
    }
    for clause in criteria_clauses(filter, &filter.exclude) {
        conditions.must_not(Some(clause));
    }
    conditions
        .time_range("pr_created_at", &filter.created_at)
        .time_range("pr_merged_at", &filter.merged_at)
        .time_range("pr_closed_at", &filter.closed_at)
        .time_range("pr_updated_at", &filter.updated_at)
        .partial_matches(&filter.partial_match, PARTIAL_MATCH_FIELDS);
    conditions.build()
}

/// Rewrite the `branch` alias to `source_branch`, in `across`, `stacks` and the sort
pub fn normalize(filter: &PrFilter) -> PrFilter {
    let alias = |dim: PrDimension| match dim {
        PrDimension::Branch => PrDimension::SourceBranch,
        other => other,
    };
    let mut next = filter.clone();
    next.grouping.across = filter.grouping.across.map(alias);
    next.grouping.stacks = filter.grouping.stacks.iter().copied().map(alias).collect();
    if filter
        .grouping
        .sort
        .first()
        .is_some_and(|entry| entry.field == PrDimension::Branch.as_str())
    {
        next.grouping.sort = filter.grouping.sort.renamed_first(PrDimension::SourceBranch.as_str());
    }
    next
}

/// Keyword field behind a flat terms dimension
pub fn dimension_field(dim: PrDimension) -> Option<&'static str> {
    match dim {
        PrDimension::RepoId => Some("pr_repo_id"),
        PrDimension::Project => Some("pr_project"),
        PrDimension::Branch | PrDimension::SourceBranch => Some("pr_source_branch"),
        PrDimension::TargetBranch => Some("pr_target_branch"),
        PrDimension::State => Some("pr_state"),
        PrDimension::Creator => Some("pr_creator_id"),
        PrDimension::Assignee => Some("pr_assignee_ids"),
        PrDimension::Reviewer => Some("pr_reviewer_ids"),
        PrDimension::Approver => Some("pr_approver_ids"),
        PrDimension::CollabState => Some("pr_collab_state"),
        PrDimension::ReviewType => Some("pr_review_type"),
        PrDimension::ApprovalStatus => Some("pr_approval_status"),
        _ => None,
    }
}

/// Date field behind a time dimension
pub fn time_field(dim: PrDimension) -> Option<&'static str> {
    match dim {
        PrDimension::PrCreated => Some("pr_created_at"),
        PrDimension::PrMerged => Some("pr_merged_at"),
        PrDimension::PrClosed => Some("pr_closed_at"),
        PrDimension::PrUpdated => Some("pr_updated_at"),
        _ => None,
    }
}

/// Nested source of an unnest dimension
pub fn unnest(dim: PrDimension) -> Option<Unnest> {
    match dim {
        PrDimension::Label => Some(LABEL),
        _ => None,
    }
}

/// Bucket aggregation for `across`, sized to `size` buckets
pub fn bucket_agg(filter: &PrFilter, across: PrDimension, size: usize) -> Aggregation {
    if let Some(field) = time_field(across) {
        return Aggregation::date_histogram(field, filter.grouping.interval);
    }
    match across {
        PrDimension::CodeChange => size_band_agg("pr_changes", CODE_CHANGE_BANDS, &filter.code_change_size),
        PrDimension::CommentDensity => {
            size_band_agg("pr_comment_count", COMMENT_DENSITY_BANDS, &filter.comment_density_size)
        }
        PrDimension::Label => Aggregation::terms(LABEL.field, size),
        other => Aggregation::terms(dimension_field(other).unwrap_or("pr_repo_id"), size),
    }
}

/// Metric sub-aggregations of a calculation
pub fn metric_aggs(calculation: PrCalculation) -> AggregationMap {
    let mut aggs = AggregationMap::new();
    match calculation.duration_field() {
        None => {
            aggs.insert(metric::PR_COUNT.to_string(), Aggregation::cardinality("pr_id"));
            aggs.insert(metric::ADDITIONS.to_string(), Aggregation::sum("pr_additions"));
            aggs.insert(metric::DELETIONS.to_string(), Aggregation::sum("pr_deletions"));
            aggs.insert(metric::CHANGES.to_string(), Aggregation::sum("pr_changes"));
            aggs.insert(metric::FILES.to_string(), Aggregation::sum("pr_files_count"));
            aggs.insert(metric::COMMENTS.to_string(), Aggregation::sum("pr_comment_count"));
        }
        Some(field) => {
            aggs.insert(metric::STATS.to_string(), Aggregation::stats(field));
            aggs.insert(metric::MEDIAN.to_string(), Aggregation::median(field));
        }
    }
    aggs
}

/// Metric a calculation sorts by; `None` sorts by document count
pub fn sort_metric(calculation: PrCalculation) -> Option<&'static str> {
    calculation.duration_field().map(|_| "median[50.0]")
}

// ============================================================================
// Collaboration report
// ============================================================================

/// Primary aggregation name of the collaboration report
pub const COLLAB_ACROSS: &str = "across_creators";

/// Drill-down aggregation name of the collaboration report
pub const COLLAB_STACK: &str = "across_approvers";

/// Separator inside the scripted creator key
pub const COLLAB_KEY_SEPARATOR: char = '#';

/// Scripted key `creator_id#creator#collab_state`
pub const COLLAB_SCRIPT: &str = "def id = doc['pr_creator_id'].size() > 0 ? doc['pr_creator_id'].value : ''; \
     def name = doc['pr_creator'].size() > 0 ? doc['pr_creator'].value : ''; \
     def state = doc['pr_collab_state'].size() > 0 ? doc['pr_collab_state'].value : ''; \
     return id + '#' + name + '#' + state;";

/// Creator x collaboration-state buckets
pub fn collab_primary_agg(size: usize) -> Aggregation {
    Aggregation::script_terms(COLLAB_SCRIPT, size)
}

/// Approver buckets under one creator row
pub fn collab_stack_agg(size: usize) -> Aggregation {
    Aggregation::terms("pr_approver_ids", size)
}

/// Sort of collaboration drill-downs
pub fn collab_stack_sort() -> SortSpec {
    SortSpec::single(PrDimension::Approver.as_str(), crate::types::SortDirection::Asc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortDirection;
    use serde_json::json;

    #[test]
    fn test_code_change_include_uses_should_ranges() {
        let mut filter = PrFilter::default();
        filter.include.code_changes = vec!["small".to_string(), "large".to_string()];
        let q = build_query(&filter);
        assert_eq!(q.must.len(), 1);
        assert_eq!(
            q.must[0].to_json(),
            json!({ "bool": { "should": [
                { "range": { "pr_changes": { "lte": 100 } } },
                { "range": { "pr_changes": { "gt": 1000 } } }
            ], "minimum_should_match": 1 } })
        );
    }

    #[test]
    fn test_exclude_creators_and_labels() {
        let mut filter = PrFilter::default();
        filter.exclude.creators = vec!["bot".to_string()];
        filter.exclude.labels = vec!["wip".to_string()];
        let q = build_query(&filter);
        assert!(q.must.is_empty());
        assert_eq!(q.must_not.len(), 2);
    }

    #[test]
    fn test_branch_alias_normalized() {
        let mut filter = PrFilter::default();
        filter.grouping.across = Some(PrDimension::Branch);
        filter.grouping.sort = SortSpec::single("branch", SortDirection::Asc);

        let normalized = normalize(&filter);
        assert_eq!(normalized.grouping.across, Some(PrDimension::SourceBranch));
        assert_eq!(normalized.grouping.sort.first().unwrap().field, "source_branch");
        assert_eq!(normalized.grouping.sort.first().unwrap().order, SortDirection::Asc);
        assert_eq!(filter.grouping.across, Some(PrDimension::Branch));
    }

    #[test]
    fn test_duration_metrics() {
        let aggs = metric_aggs(PrCalculation::ReviewerApproveTime);
        assert_eq!(aggs[metric::STATS].to_json()["stats"]["field"], "pr_approval_time");
        assert_eq!(aggs[metric::MEDIAN].to_json()["percentiles"]["percents"], json!([50.0]));
        assert!(!aggs.contains_key(metric::PR_COUNT));
    }

    #[test]
    fn test_count_metrics_use_cardinality() {
        let aggs = metric_aggs(PrCalculation::Count);
        assert_eq!(aggs[metric::PR_COUNT].to_json(), json!({ "cardinality": { "field": "pr_id" } }));
        assert_eq!(sort_metric(PrCalculation::Count), None);
    }

    #[test]
    fn test_time_dimension_histogram() {
        let filter = PrFilter::default();
        let agg = bucket_agg(&filter, PrDimension::PrMerged, 10).to_json();
        assert_eq!(agg["date_histogram"]["field"], "pr_merged_at");
    }
}
