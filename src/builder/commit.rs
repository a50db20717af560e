//! Commit query and aggregation builder

use super::{size_band_agg, BuildParams, Conditions, Unnest};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::{BoolQuery, Query};
use crate::dsl::request::SortField;
use crate::filter::{ActivityAcross, CommitCalculation, CommitCriteria, CommitDimension, CommitFilter, ContributorRole};

/// Index prefix; the tenant is appended
pub const INDEX_PREFIX: &str = "scm_commits_";

/// Field family marker
pub const FIELD_PREFIX: &str = "c_";

/// Code change bucket names, smallest first
pub const CODE_CHANGE_BANDS: [&str; 3] = ["small", "medium", "large"];

pub(crate) const TECHNOLOGY: Unnest = Unnest {
    path: "c_technologies",
    field: "c_technologies.name",
};

/// Sub-aggregation names read back by the converter
pub mod metric {
    /// Files changed
    pub const FILES: &str = "files_ct";
    /// Lines added
    pub const ADDITIONS: &str = "addition_ct";
    /// Lines removed
    pub const DELETIONS: &str = "deletion_ct";
    /// Lines changed
    pub const CHANGES: &str = "changes_ct";
    /// Median change size
    pub const MEDIAN: &str = "median";
    /// Nested per-file change records
    pub const FILE_CHANGES: &str = "file_changes";
    /// Lines across all change records
    pub const TOTAL_LINES: &str = "total_lines";
    /// Lines with no prior revision
    pub const NEW_LINES: &str = "new_lines";
    /// Lines whose prior revision is after the legacy cutoff
    pub const REFACTORED_LINES: &str = "refactored_lines";
    /// Lines whose prior revision is at or before the legacy cutoff
    pub const LEGACY_LINES: &str = "legacy_lines";
    /// Sum inside each line-class filter
    pub const LINES: &str = "lines";
    /// Day histogram of commit activity
    pub const CODING_DAYS: &str = "coding_days";
    /// Lines changed over the bucket
    pub const COMMIT_SIZE: &str = "commit_size";
}

const PARTIAL_MATCH_FIELDS: &[(&str, &str)] = &[
    ("repo_id", "c_repo_id"),
    ("project", "c_project"),
    ("branch", "c_branch.keyword"),
    ("message", "c_message"),
];

fn criteria_clauses(criteria: &CommitCriteria) -> Vec<Query> {
    let terms: [(&str, &[String]); 11] = [
        ("c_integration_id", &criteria.integration_ids),
        ("c_repo_id", &criteria.repo_ids),
        ("c_project", &criteria.projects),
        ("c_commit_sha", &criteria.commit_shas),
        ("c_branch.keyword", &criteria.branches),
        ("c_file_types", &criteria.file_types),
        ("c_vcs_type", &criteria.vcs_types),
        ("c_author_id", &criteria.authors),
        ("c_committer_id", &criteria.committers),
        ("c_message", &criteria.commit_titles),
        ("c_day", &criteria.days_of_week),
    ];
    terms
        .iter()
        .filter_map(|(field, values)| crate::filter::terms_if_any(field, values))
        .chain(TECHNOLOGY.terms_query(&criteria.technologies))
        .collect()
}

/// Boolean query for a commit filter
pub fn build_query(filter: &CommitFilter) -> BoolQuery {
    let mut conditions = Conditions::new();
    for clause in criteria_clauses(&filter.include) {
        conditions.must(Some(clause));
    }
    for clause in criteria_clauses(&filter.exclude) {
        conditions.must_not(Some(clause));
    }
    conditions
        .time_range("c_committed_at", &filter.committed_at)
        .value_range("c_loc", &filter.loc)
        .partial_matches(&filter.partial_match, PARTIAL_MATCH_FIELDS);
    conditions.build()
}

/// Keyword field behind a flat terms dimension
pub fn dimension_field(dim: CommitDimension) -> Option<&'static str> {
    match dim {
        CommitDimension::Author => Some("c_author_id"),
        CommitDimension::Committer => Some("c_committer_id"),
        CommitDimension::RepoId => Some("c_repo_id"),
        CommitDimension::Project => Some("c_project"),
        CommitDimension::VcsType => Some("c_vcs_type"),
        CommitDimension::FileType => Some("c_file_types"),
        CommitDimension::CommitBranch => Some("c_branch.keyword"),
        CommitDimension::Technology | CommitDimension::Trend | CommitDimension::CodeChange => None,
    }
}

/// Nested source of an unnest dimension
pub fn unnest(dim: CommitDimension) -> Option<Unnest> {
    match dim {
        CommitDimension::Technology => Some(TECHNOLOGY),
        _ => None,
    }
}

/// Bucket aggregation for `across`, sized to `size` buckets
pub fn bucket_agg(filter: &CommitFilter, across: CommitDimension, size: usize) -> Aggregation {
    match across {
        CommitDimension::Trend => Aggregation::date_histogram("c_committed_at", filter.grouping.interval),
        CommitDimension::CodeChange => {
            size_band_agg("c_tot_lines_changed", CODE_CHANGE_BANDS, &filter.code_change_size)
        }
        CommitDimension::Technology => Aggregation::terms(TECHNOLOGY.field, size),
        other => Aggregation::terms(dimension_field(other).unwrap_or("c_repo_id"), size),
    }
}

fn line_class(query: Query) -> Aggregation {
    Aggregation::filter(query).with_sub(metric::LINES, Aggregation::sum("c_files.total_change"))
}

/// Metric sub-aggregations of a calculation
pub fn metric_aggs(filter: &CommitFilter, calculation: CommitCalculation, params: &BuildParams) -> AggregationMap {
    let mut aggs = AggregationMap::new();
    match calculation {
        CommitCalculation::Count => {
            let cutoff_ms = params.legacy_cutoff(filter.legacy_cutoff).saturating_mul(1000);
            let previous = "c_files.previous_committed_at";

            aggs.insert(metric::FILES.to_string(), Aggregation::sum("c_files_ct"));
            aggs.insert(metric::ADDITIONS.to_string(), Aggregation::sum("c_tot_lines_added"));
            aggs.insert(metric::DELETIONS.to_string(), Aggregation::sum("c_tot_lines_removed"));
            aggs.insert(metric::CHANGES.to_string(), Aggregation::sum("c_tot_lines_changed"));
            aggs.insert(metric::MEDIAN.to_string(), Aggregation::median("c_tot_lines_changed"));
            aggs.insert(
                metric::FILE_CHANGES.to_string(),
                Aggregation::nested("c_files")
                    .with_sub(metric::TOTAL_LINES, Aggregation::sum("c_files.total_change"))
                    .with_sub(metric::NEW_LINES, line_class(Query::missing(previous)))
                    .with_sub(
                        metric::REFACTORED_LINES,
                        line_class(Query::band(previous, Some(cutoff_ms), None)),
                    )
                    .with_sub(
                        metric::LEGACY_LINES,
                        line_class(Query::band(previous, None, Some(cutoff_ms))),
                    ),
            );
        }
        CommitCalculation::CommitCount => {
            aggs.insert(metric::ADDITIONS.to_string(), Aggregation::sum("c_additions"));
            aggs.insert(metric::DELETIONS.to_string(), Aggregation::sum("c_deletions"));
            aggs.insert(metric::CHANGES.to_string(), Aggregation::sum("c_changes"));
            aggs.insert(metric::MEDIAN.to_string(), Aggregation::median("c_changes"));
        }
        CommitCalculation::CommitDays => {
            aggs.insert(
                metric::CODING_DAYS.to_string(),
                Aggregation::date_histogram("c_committed_at", crate::types::AggInterval::Day),
            );
            aggs.insert(metric::COMMIT_SIZE.to_string(), Aggregation::sum("c_changes"));
            aggs.insert(metric::MEDIAN.to_string(), Aggregation::median("c_changes"));
        }
    }
    aggs
}

/// Metric a calculation sorts by; `None` sorts by document count
pub fn sort_metric(calculation: CommitCalculation) -> Option<&'static str> {
    match calculation {
        CommitCalculation::Count => None,
        CommitCalculation::CommitCount | CommitCalculation::CommitDays => Some("median[50.0]"),
    }
}

/// Sub-aggregation names of the activity listings
pub mod activity {
    /// Distinct keys across all pages
    pub const TOTAL: &str = "total_count";
    /// Distinct commits
    pub const NUM_COMMITS: &str = "num_commits";
    /// Distinct repositories
    pub const NUM_REPOS: &str = "num_repos";
    /// Lines added
    pub const ADDITIONS: &str = "num_additions";
    /// Lines removed
    pub const DELETIONS: &str = "num_deletions";
    /// Lines changed
    pub const CHANGES: &str = "num_changes";
    /// Display name of a contributor
    pub const NAMES: &str = "names";
    /// File extensions
    pub const FILE_TYPES: &str = "file_types";
    /// Repository ids
    pub const REPOS: &str = "repos";
    /// Technology names
    pub const TECHNOLOGIES: &str = "technologies";
    /// Nested file change records
    pub const ACROSS_FILES: &str = "across_files";
    /// File buckets inside the nested records
    pub const FILE_LIST: &str = "file_list";
    /// Parent commits of a file bucket
    pub const COMMITS: &str = "commits";
}

/// Sortable columns of the contributor listing
pub const CONTRIBUTOR_SORTABLE: &[&str] = &["num_commits", "num_repos", "num_additions", "num_deletions", "num_changes"];

/// Sortable columns of the file-type / repository and file listings
pub const ACTIVITY_SORTABLE: &[&str] = &["num_commits", "num_additions", "num_deletions", "num_changes"];

/// Values listed per contributor for file types, repositories and technologies
const BREADTH_SIZE: usize = 100;

/// Id and display-name fields of a contributor role
pub fn contributor_fields(role: ContributorRole) -> (&'static str, &'static str) {
    match role {
        ContributorRole::Author => ("c_author_id", "c_author"),
        ContributorRole::Committer => ("c_committer_id", "c_committer"),
    }
}

/// Keyword field of an activity grouping
pub fn activity_field(across: ActivityAcross) -> &'static str {
    match across {
        ActivityAcross::FileType => "c_file_types",
        ActivityAcross::RepoId => "c_repo_id",
    }
}

fn commit_totals(agg: Aggregation) -> Aggregation {
    agg.with_sub(activity::NUM_COMMITS, Aggregation::cardinality("c_commit_sha"))
        .with_sub(activity::ADDITIONS, Aggregation::sum("c_additions"))
        .with_sub(activity::DELETIONS, Aggregation::sum("c_deletions"))
        .with_sub(activity::CHANGES, Aggregation::sum("c_changes"))
}

/// Contributor buckets ordered by `order`, plus the distinct-contributor total
pub fn contributor_aggs(role: ContributorRole, order: &SortField, size: usize) -> AggregationMap {
    let (id_field, name_field) = contributor_fields(role);
    let buckets = commit_totals(Aggregation::terms(id_field, size))
        .with_order(order.field.clone(), order.order)
        .with_sub(activity::NAMES, Aggregation::terms(name_field, 1))
        .with_sub(activity::NUM_REPOS, Aggregation::cardinality("c_repo_id"))
        .with_sub(activity::FILE_TYPES, Aggregation::terms("c_file_types", BREADTH_SIZE))
        .with_sub(activity::REPOS, Aggregation::terms("c_repo_id", BREADTH_SIZE))
        .with_sub(
            activity::TECHNOLOGIES,
            Aggregation::nested(TECHNOLOGY.path)
                .with_sub(activity::TECHNOLOGIES, Aggregation::terms(TECHNOLOGY.field, BREADTH_SIZE)),
        );

    let mut aggs = AggregationMap::new();
    aggs.insert(format!("across_{}", role.as_str()), buckets);
    aggs.insert(activity::TOTAL.to_string(), Aggregation::cardinality(id_field));
    aggs
}

/// File-type or repository buckets ordered by `order`, plus the distinct-key total
pub fn activity_aggs(across: ActivityAcross, order: &SortField, size: usize) -> AggregationMap {
    let field = activity_field(across);
    let buckets = commit_totals(Aggregation::terms(field, size)).with_order(order.field.clone(), order.order);

    let mut aggs = AggregationMap::new();
    aggs.insert(format!("across_{}", across.as_str()), buckets);
    aggs.insert(activity::TOTAL.to_string(), Aggregation::cardinality(field));
    aggs
}

/// Per-file buckets over the nested change records.
///
/// A file bucket counts one change record per commit, so `num_commits`
/// orders by bucket document count.
pub fn file_aggs(order: &SortField, size: usize) -> AggregationMap {
    let key = if order.field == activity::NUM_COMMITS {
        "_count".to_string()
    } else {
        order.field.clone()
    };
    let files = Aggregation::terms("c_files.file_name", size)
        .with_order(key, order.order)
        .with_sub(activity::ADDITIONS, Aggregation::sum("c_files.addition"))
        .with_sub(activity::DELETIONS, Aggregation::sum("c_files.deletion"))
        .with_sub(activity::CHANGES, Aggregation::sum("c_files.change"))
        .with_sub(
            activity::COMMITS,
            Aggregation::reverse_nested().with_sub(activity::REPOS, Aggregation::terms("c_repo_id", BREADTH_SIZE)),
        );

    let mut aggs = AggregationMap::new();
    aggs.insert(
        activity::ACROSS_FILES.to_string(),
        Aggregation::nested("c_files")
            .with_sub(activity::FILE_LIST, files)
            .with_sub(activity::TOTAL, Aggregation::cardinality("c_files.file_name")),
    );
    aggs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeRange;
    use serde_json::json;

    fn params() -> BuildParams {
        BuildParams {
            now_secs: 100 * 86_400,
            legacy_window_days: 60,
        }
    }

    #[test]
    fn test_include_and_exclude_clauses() {
        let mut filter = CommitFilter::default();
        filter.include.repo_ids = vec!["r1".to_string()];
        filter.include.technologies = vec!["Rust".to_string()];
        filter.exclude.authors = vec!["bot".to_string()];
        filter.committed_at = TimeRange::between(10, 20);

        let q = build_query(&filter);
        assert_eq!(q.must.len(), 3);
        assert_eq!(q.must_not, vec![Query::terms("c_author_id", &["bot"])]);
        assert!(q.must.contains(&Query::time_range("c_committed_at", Some(10_000), Some(20_000)).unwrap()));
        assert!(q
            .must
            .contains(&Query::nested("c_technologies", Query::terms("c_technologies.name", &["Rust"]))));
    }

    #[test]
    fn test_empty_filter_builds_empty_query() {
        assert!(build_query(&CommitFilter::default()).is_empty());
    }

    #[test]
    fn test_bucket_aggs_per_dimension() {
        let filter = CommitFilter::default();
        let agg = bucket_agg(&filter, CommitDimension::CommitBranch, 25).to_json();
        assert_eq!(agg, json!({ "terms": { "field": "c_branch.keyword", "size": 25 } }));

        let agg = bucket_agg(&filter, CommitDimension::Trend, 25).to_json();
        assert_eq!(agg["date_histogram"]["field"], "c_committed_at");

        let agg = bucket_agg(&filter, CommitDimension::CodeChange, 25).to_json();
        assert!(agg["filters"]["filters"]["large"].is_object());
    }

    #[test]
    fn test_count_metrics_classify_lines() {
        let aggs = metric_aggs(&CommitFilter::default(), CommitCalculation::Count, &params());
        let files = aggs[metric::FILE_CHANGES].to_json();
        let cutoff_ms = 40 * 86_400 * 1000_i64;
        assert_eq!(
            files["aggs"]["refactored_lines"]["filter"],
            json!({ "range": { "c_files.previous_committed_at": { "gt": cutoff_ms } } })
        );
        assert_eq!(
            files["aggs"]["legacy_lines"]["filter"],
            json!({ "range": { "c_files.previous_committed_at": { "lte": cutoff_ms } } })
        );
        assert!(aggs.contains_key(metric::MEDIAN));
    }

    #[test]
    fn test_commit_days_metrics() {
        let aggs = metric_aggs(&CommitFilter::default(), CommitCalculation::CommitDays, &params());
        assert!(aggs.contains_key(metric::CODING_DAYS));
        assert!(aggs.contains_key(metric::COMMIT_SIZE));
        assert_eq!(sort_metric(CommitCalculation::CommitDays), Some("median[50.0]"));
    }

    #[test]
    fn test_contributor_aggs_order_and_total() {
        let order = SortField::new("num_repos", crate::types::SortDirection::Asc);
        let aggs = contributor_aggs(ContributorRole::Committer, &order, 20);

        let buckets = aggs["across_committer"].to_json();
        assert_eq!(buckets["terms"]["field"], "c_committer_id");
        assert_eq!(buckets["terms"]["size"], 20);
        assert_eq!(buckets["terms"]["order"], json!({ "num_repos": "asc" }));
        assert_eq!(buckets["aggs"]["names"]["terms"]["field"], "c_committer");
        assert_eq!(buckets["aggs"]["technologies"]["nested"]["path"], "c_technologies");
        assert_eq!(aggs[activity::TOTAL].to_json(), json!({ "cardinality": { "field": "c_committer_id" } }));
    }

    #[test]
    fn test_activity_aggs_per_grouping() {
        let order = SortField::new("num_changes", crate::types::SortDirection::Desc);
        let aggs = activity_aggs(ActivityAcross::FileType, &order, 10);
        let buckets = aggs["across_file_type"].to_json();
        assert_eq!(buckets["terms"]["field"], "c_file_types");
        assert_eq!(buckets["aggs"]["num_commits"]["cardinality"]["field"], "c_commit_sha");
        assert_eq!(aggs[activity::TOTAL].to_json()["cardinality"]["field"], "c_file_types");

        assert!(activity_aggs(ActivityAcross::RepoId, &order, 10).contains_key("across_repo_id"));
    }

    #[test]
    fn test_file_aggs_order_commits_by_count() {
        let order = SortField::new("num_commits", crate::types::SortDirection::Desc);
        let aggs = file_aggs(&order, 5).remove(activity::ACROSS_FILES).unwrap().to_json();
        assert_eq!(aggs["nested"]["path"], "c_files");
        assert_eq!(aggs["aggs"]["file_list"]["terms"]["order"], json!({ "_count": "desc" }));
        assert!(aggs["aggs"]["file_list"]["aggs"]["commits"]["reverse_nested"].is_object());
        assert_eq!(aggs["aggs"]["total_count"]["cardinality"]["field"], "c_files.file_name");

        let order = SortField::new("num_additions", crate::types::SortDirection::Asc);
        let aggs = file_aggs(&order, 5).remove(activity::ACROSS_FILES).unwrap().to_json();
        assert_eq!(aggs["aggs"]["file_list"]["terms"]["order"], json!({ "num_additions": "asc" }));
    }
}
