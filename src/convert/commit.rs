//! Commit rows and records

use serde::Deserialize;

use super::list::{millis_to_secs, null_as_default, LineBreakdown};
use super::{as_count, percentage};
use crate::builder::commit::{activity, metric};
use crate::dsl::response::{AggregateView, Bucket};
use crate::filter::{CommitCalculation, CommitFilter};
use crate::result::{ActivityRecord, AggregationResult, CommitRecord, ContributorRecord, FileRecord};

/// Fill the metric fields of a commit row from its bucket
pub fn fill_metrics(
    row: &mut AggregationResult,
    bucket: AggregateView<'_>,
    calculation: CommitCalculation,
    filter: &CommitFilter,
) {
    match calculation {
        CommitCalculation::Count => {
            row.files_changed_count = as_count(bucket.metric(metric::FILES));
            row.lines_added_count = as_count(bucket.metric(metric::ADDITIONS));
            row.lines_removed_count = as_count(bucket.metric(metric::DELETIONS));
            row.lines_changed_count = as_count(bucket.metric(metric::CHANGES));
            row.median = bucket.median(metric::MEDIAN);
            row.avg_change_size = match (row.lines_changed_count, row.count) {
                (Some(changes), count) if count > 0 => Some(changes as f64 / count as f64),
                _ => None,
            };

            if let Some(files) = bucket.sub(metric::FILE_CHANGES) {
                let class = |name: &str| {
                    files
                        .sub(name)
                        .and_then(|f| f.metric(metric::LINES))
                        .map(|v| v as i64)
                        .unwrap_or(0)
                };
                let total = files.metric(metric::TOTAL_LINES).map(|v| v as i64).unwrap_or(0);
                row.pct_new_lines = Some(percentage(class(metric::NEW_LINES), total));
                row.pct_refactored_lines = Some(percentage(class(metric::REFACTORED_LINES), total));
                row.pct_legacy_lines = Some(percentage(class(metric::LEGACY_LINES), total));
            }
        }
        CommitCalculation::CommitCount => {
            row.lines_added_count = as_count(bucket.metric(metric::ADDITIONS));
            row.lines_removed_count = as_count(bucket.metric(metric::DELETIONS));
            row.lines_changed_count = as_count(bucket.metric(metric::CHANGES));
            row.median = bucket.median(metric::MEDIAN);
        }
        CommitCalculation::CommitDays => {
            let days = bucket
                .sub(metric::CODING_DAYS)
                .map(|h| h.buckets().len() as u64)
                .unwrap_or(0);
            row.coding_days = Some(days);
            row.commit_size = as_count(bucket.metric(metric::COMMIT_SIZE));
            row.median = bucket.median(metric::MEDIAN);
            row.mean = filter
                .committed_at
                .duration_days()
                .filter(|d| *d > 0)
                .map(|d| days as f64 * filter.grouping.interval.approx_days() / d as f64);
        }
    }
}

/// Per-file change record inside a commit document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileChange {
    /// File path
    pub file_name: Option<String>,
    /// Lines changed in this file
    #[serde(deserialize_with = "null_as_default")]
    pub total_change: i64,
    /// Commit time of the revision this change replaces, epoch millis
    pub previous_committed_at: Option<i64>,
}

/// Commit document as stored in the index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommitDocument {
    #[serde(rename = "c_id")]
    id: Option<String>,
    #[serde(rename = "c_commit_sha", deserialize_with = "null_as_default")]
    commit_sha: String,
    #[serde(rename = "c_repo_id", deserialize_with = "null_as_default")]
    repo_id: String,
    #[serde(rename = "c_project")]
    project: Option<String>,
    #[serde(rename = "c_branch")]
    branch: Option<String>,
    #[serde(rename = "c_vcs_type")]
    vcs_type: Option<String>,
    #[serde(rename = "c_author")]
    author: Option<String>,
    #[serde(rename = "c_author_id")]
    author_id: Option<String>,
    #[serde(rename = "c_committer")]
    committer: Option<String>,
    #[serde(rename = "c_committer_id")]
    committer_id: Option<String>,
    #[serde(rename = "c_message")]
    message: Option<String>,
    #[serde(rename = "c_file_types", deserialize_with = "null_as_default")]
    file_types: Vec<String>,
    #[serde(rename = "c_files_ct", deserialize_with = "null_as_default")]
    files_ct: i64,
    #[serde(rename = "c_additions", deserialize_with = "null_as_default")]
    additions: i64,
    #[serde(rename = "c_deletions", deserialize_with = "null_as_default")]
    deletions: i64,
    #[serde(rename = "c_changes", deserialize_with = "null_as_default")]
    changes: i64,
    #[serde(rename = "c_committed_at")]
    committed_at: Option<i64>,
    #[serde(rename = "c_created_at")]
    created_at: Option<i64>,
    #[serde(rename = "c_files", deserialize_with = "null_as_default")]
    files: Vec<FileChange>,
}

/// Listing record with derived line metrics; `cutoff_secs` separates
/// refactored from legacy lines
pub fn to_record(doc_id: String, doc: CommitDocument, cutoff_secs: i64) -> CommitRecord {
    let lines = LineBreakdown::classify(
        doc.files.iter().map(|f| (f.total_change, f.previous_committed_at)),
        cutoff_secs,
    );
    CommitRecord {
        id: doc.id.unwrap_or(doc_id),
        commit_sha: doc.commit_sha,
        repo_id: doc.repo_id,
        project: doc.project,
        branch: doc.branch,
        vcs_type: doc.vcs_type,
        author: doc.author,
        author_id: doc.author_id,
        committer: doc.committer,
        committer_id: doc.committer_id,
        message: doc.message,
        file_types: doc.file_types,
        files_ct: doc.files_ct,
        additions: doc.additions,
        deletions: doc.deletions,
        changes: doc.changes,
        committed_at: millis_to_secs(doc.committed_at),
        created_at: millis_to_secs(doc.created_at),
        total_lines_changed: lines.total,
        new_lines: lines.new,
        refactored_lines: lines.refactored,
        legacy_lines: lines.legacy,
        pct_new_lines: lines.pct_new(),
        pct_refactored_lines: lines.pct_refactored(),
        pct_legacy_lines: lines.pct_legacy(),
    }
}

fn keys(view: Option<AggregateView<'_>>) -> Vec<String> {
    view.map(|v| v.buckets().iter().filter_map(Bucket::key_string).collect())
        .unwrap_or_default()
}

fn distinct(bucket: &Bucket<'_>, name: &str) -> u64 {
    bucket.metric(name).map(|v| v.round() as u64).unwrap_or(0)
}

fn lines(bucket: &Bucket<'_>, name: &str) -> i64 {
    as_count(bucket.metric(name)).unwrap_or(0)
}

/// Contributor row of one identity bucket
pub fn to_contributor(bucket: &Bucket<'_>) -> Option<ContributorRecord> {
    Some(ContributorRecord {
        id: bucket.key_string()?,
        name: bucket
            .sub(activity::NAMES)
            .and_then(|names| names.buckets().first().and_then(Bucket::key_string)),
        num_commits: distinct(bucket, activity::NUM_COMMITS),
        num_repos: distinct(bucket, activity::NUM_REPOS),
        num_additions: lines(bucket, activity::ADDITIONS),
        num_deletions: lines(bucket, activity::DELETIONS),
        num_changes: lines(bucket, activity::CHANGES),
        file_types: keys(bucket.sub(activity::FILE_TYPES)),
        repo_breadth: keys(bucket.sub(activity::REPOS)),
        tech_breadth: keys(
            bucket
                .sub(activity::TECHNOLOGIES)
                .and_then(|nested| nested.sub(activity::TECHNOLOGIES)),
        ),
    })
}

/// File-type or repository row of one bucket
pub fn to_activity(bucket: &Bucket<'_>) -> Option<ActivityRecord> {
    Some(ActivityRecord {
        name: bucket.key_string()?,
        num_commits: distinct(bucket, activity::NUM_COMMITS),
        num_additions: lines(bucket, activity::ADDITIONS),
        num_deletions: lines(bucket, activity::DELETIONS),
        num_changes: lines(bucket, activity::CHANGES),
    })
}

/// File row of one nested file bucket
pub fn to_file(bucket: &Bucket<'_>) -> Option<FileRecord> {
    Some(FileRecord {
        file_name: bucket.key_string()?,
        num_commits: bucket.doc_count(),
        repo_ids: keys(bucket.sub(activity::COMMITS).and_then(|c| c.sub(activity::REPOS))),
        num_additions: lines(bucket, activity::ADDITIONS),
        num_deletions: lines(bucket, activity::DELETIONS),
        num_changes: lines(bucket, activity::CHANGES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggInterval, TimeRange};
    use serde_json::json;

    #[test]
    fn test_count_metrics() {
        let raw = json!({
            "doc_count": 4,
            "files_ct": { "value": 8.0 },
            "addition_ct": { "value": 30.0 },
            "deletion_ct": { "value": 10.0 },
            "changes_ct": { "value": 40.0 },
            "median": { "values": { "50.0": 9.0 } },
            "file_changes": {
                "doc_count": 8,
                "total_lines": { "value": 40.0 },
                "new_lines": { "doc_count": 2, "lines": { "value": 10.0 } },
                "refactored_lines": { "doc_count": 2, "lines": { "value": 20.0 } },
                "legacy_lines": { "doc_count": 4, "lines": { "value": 10.0 } }
            }
        });
        let mut row = AggregationResult::new("alice", 4);
        fill_metrics(&mut row, AggregateView::new(&raw), CommitCalculation::Count, &CommitFilter::default());

        assert_eq!(row.files_changed_count, Some(8));
        assert_eq!(row.lines_changed_count, Some(40));
        assert_eq!(row.median, Some(9.0));
        assert_eq!(row.avg_change_size, Some(10.0));
        assert_eq!(row.pct_new_lines, Some(25.0));
        assert_eq!(row.pct_refactored_lines, Some(50.0));
        assert_eq!(row.pct_legacy_lines, Some(25.0));
    }

    #[test]
    fn test_commit_days_mean() {
        let raw = json!({
            "doc_count": 5,
            "coding_days": { "buckets": [ { "key": 0, "doc_count": 3 }, { "key": 86400000, "doc_count": 2 } ] },
            "commit_size": { "value": 120.0 }
        });
        let mut filter = CommitFilter::default();
        filter.committed_at = TimeRange::between(0, 30 * 86_400);
        filter.grouping.interval = AggInterval::Month;

        let mut row = AggregationResult::new("alice", 5);
        fill_metrics(&mut row, AggregateView::new(&raw), CommitCalculation::CommitDays, &filter);
        assert_eq!(row.coding_days, Some(2));
        assert_eq!(row.commit_size, Some(120));
        assert_eq!(row.mean, Some(2.0));
    }

    #[test]
    fn test_record_with_no_changed_lines() {
        let doc: CommitDocument = serde_json::from_value(json!({
            "c_commit_sha": "abc",
            "c_repo_id": "r1",
            "c_committed_at": 1_700_000_000_000_i64,
            "c_files": []
        }))
        .unwrap();
        let record = to_record("doc-1".to_string(), doc, 0);
        assert_eq!(record.id, "doc-1");
        assert_eq!(record.committed_at, Some(1_700_000_000));
        assert_eq!(record.total_lines_changed, 0);
        assert_eq!(record.pct_new_lines, 0.0);
        assert_eq!(record.pct_refactored_lines, 0.0);
        assert_eq!(record.pct_legacy_lines, 0.0);
    }

    #[test]
    fn test_null_line_counts_read_as_zero() {
        let doc: CommitDocument = serde_json::from_value(json!({
            "c_commit_sha": "abc",
            "c_repo_id": null,
            "c_additions": null,
            "c_changes": null,
            "c_file_types": null,
            "c_files": [ { "file_name": "a.rs", "total_change": null } ]
        }))
        .unwrap();
        let record = to_record("doc-1".to_string(), doc, 0);
        assert_eq!(record.additions, 0);
        assert_eq!(record.changes, 0);
        assert_eq!(record.repo_id, "");
        assert!(record.file_types.is_empty());
        assert_eq!(record.total_lines_changed, 0);
        assert_eq!(record.pct_new_lines, 0.0);
    }

    #[test]
    fn test_contributor_row() {
        let raw = json!({ "buckets": [ {
            "key": "u1",
            "doc_count": 9,
            "names": { "buckets": [ { "key": "Alice", "doc_count": 9 } ] },
            "num_commits": { "value": 7.0 },
            "num_repos": { "value": 2.0 },
            "num_additions": { "value": 120.0 },
            "num_deletions": { "value": 20.0 },
            "num_changes": { "value": 140.0 },
            "file_types": { "buckets": [ { "key": "rs", "doc_count": 6 }, { "key": "toml", "doc_count": 1 } ] },
            "repos": { "buckets": [ { "key": "api", "doc_count": 5 }, { "key": "web", "doc_count": 2 } ] },
            "technologies": { "doc_count": 3, "technologies": { "buckets": [ { "key": "Rust", "doc_count": 3 } ] } }
        } ] });
        let buckets = AggregateView::new(&raw).buckets();
        let row = to_contributor(&buckets[0]).unwrap();

        assert_eq!(row.id, "u1");
        assert_eq!(row.name.as_deref(), Some("Alice"));
        assert_eq!(row.num_commits, 7);
        assert_eq!(row.num_repos, 2);
        assert_eq!(row.num_changes, 140);
        assert_eq!(row.file_types, vec!["rs".to_string(), "toml".to_string()]);
        assert_eq!(row.repo_breadth, vec!["api".to_string(), "web".to_string()]);
        assert_eq!(row.tech_breadth, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_activity_row_defaults_missing_metrics() {
        let raw = json!({ "buckets": [ { "key": "rs", "doc_count": 4, "num_commits": { "value": 4.0 } } ] });
        let buckets = AggregateView::new(&raw).buckets();
        let row = to_activity(&buckets[0]).unwrap();
        assert_eq!(row.name, "rs");
        assert_eq!(row.num_commits, 4);
        assert_eq!(row.num_additions, 0);
    }

    #[test]
    fn test_file_row_counts_change_records() {
        let raw = json!({ "buckets": [ {
            "key": "src/lib.rs",
            "doc_count": 3,
            "num_additions": { "value": 30.0 },
            "num_changes": { "value": 45.0 },
            "commits": { "doc_count": 3, "repos": { "buckets": [ { "key": "api", "doc_count": 3 } ] } }
        } ] });
        let buckets = AggregateView::new(&raw).buckets();
        let row = to_file(&buckets[0]).unwrap();
        assert_eq!(row.file_name, "src/lib.rs");
        assert_eq!(row.num_commits, 3);
        assert_eq!(row.repo_ids, vec!["api".to_string()]);
        assert_eq!(row.num_changes, 45);
        assert_eq!(row.num_deletions, 0);
    }
}
