//! Pull request rows and records

use serde::Deserialize;

use super::as_count;
use super::list::{millis_to_secs, null_as_default};
use crate::builder::pull_request::{metric, COLLAB_KEY_SEPARATOR};
use crate::dsl::response::AggregateView;
use crate::filter::PrCalculation;
use crate::result::{AggregationResult, PrRecord};

/// Fill the metric fields of a pull request row from its bucket
pub fn fill_metrics(row: &mut AggregationResult, bucket: AggregateView<'_>, calculation: PrCalculation) {
    if calculation.duration_field().is_some() {
        if let Some(stats) = bucket.sub(metric::STATS) {
            row.min = stats.stat("min");
            row.max = stats.stat("max");
            row.sum = stats.stat("sum");
            row.mean = stats.stat("avg");
        }
        row.median = bucket.median(metric::MEDIAN);
        return;
    }

    if let Some(distinct) = bucket.metric(metric::PR_COUNT) {
        row.count = distinct.max(0.0) as u64;
    }
    row.lines_added_count = as_count(bucket.metric(metric::ADDITIONS));
    row.lines_removed_count = as_count(bucket.metric(metric::DELETIONS));
    row.lines_changed_count = as_count(bucket.metric(metric::CHANGES));
    row.files_changed_count = as_count(bucket.metric(metric::FILES));
    row.comment_count = as_count(bucket.metric(metric::COMMENTS));
    if row.count > 0 {
        row.avg_change_size = row.lines_changed_count.map(|c| c as f64 / row.count as f64);
    }
}

/// Creator key of a collaboration bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollabKey {
    /// Creator id
    pub creator_id: String,
    /// Creator display name
    pub creator: String,
    /// Collaboration state
    pub collab_state: String,
}

impl CollabKey {
    /// Split a scripted `id#name#state` key. Names may not contain the
    /// separator but the state is taken as the remainder.
    pub fn parse(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, COLLAB_KEY_SEPARATOR);
        let creator_id = parts.next()?.to_string();
        let creator = parts.next()?.to_string();
        let collab_state = parts.next()?.to_string();
        Some(Self {
            creator_id,
            creator,
            collab_state,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct NamedValue {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
}

/// Pull request document as stored in the index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrDocument {
    #[serde(rename = "pr_id")]
    id: Option<String>,
    #[serde(rename = "pr_number")]
    number: Option<String>,
    #[serde(rename = "pr_title")]
    title: Option<String>,
    #[serde(rename = "pr_repo_id")]
    repo_id: Option<String>,
    #[serde(rename = "pr_project")]
    project: Option<String>,
    #[serde(rename = "pr_state")]
    state: Option<String>,
    #[serde(rename = "pr_creator")]
    creator: Option<String>,
    #[serde(rename = "pr_creator_id")]
    creator_id: Option<String>,
    #[serde(rename = "pr_source_branch")]
    source_branch: Option<String>,
    #[serde(rename = "pr_target_branch")]
    target_branch: Option<String>,
    #[serde(rename = "pr_collab_state")]
    collab_state: Option<String>,
    #[serde(rename = "pr_labels", deserialize_with = "null_as_default")]
    labels: Vec<NamedValue>,
    #[serde(rename = "pr_assignee_ids", deserialize_with = "null_as_default")]
    assignee_ids: Vec<String>,
    #[serde(rename = "pr_reviewer_ids", deserialize_with = "null_as_default")]
    reviewer_ids: Vec<String>,
    #[serde(rename = "pr_approver_ids", deserialize_with = "null_as_default")]
    approver_ids: Vec<String>,
    #[serde(rename = "pr_additions")]
    additions: Option<i64>,
    #[serde(rename = "pr_deletions")]
    deletions: Option<i64>,
    #[serde(rename = "pr_changes")]
    changes: Option<i64>,
    #[serde(rename = "pr_files_count")]
    files_count: Option<i64>,
    #[serde(rename = "pr_comment_count")]
    comment_count: Option<i64>,
    #[serde(rename = "pr_cycle_time")]
    cycle_time: Option<i64>,
    #[serde(rename = "pr_created_at")]
    created_at: Option<i64>,
    #[serde(rename = "pr_merged_at")]
    merged_at: Option<i64>,
    #[serde(rename = "pr_closed_at")]
    closed_at: Option<i64>,
    #[serde(rename = "pr_updated_at")]
    updated_at: Option<i64>,
}

/// Listing record; line counts missing from the document read as 0
pub fn to_record(doc_id: String, doc: PrDocument) -> PrRecord {
    PrRecord {
        id: doc.id.unwrap_or(doc_id),
        number: doc.number,
        title: doc.title,
        repo_id: doc.repo_id,
        project: doc.project,
        state: doc.state,
        creator: doc.creator,
        creator_id: doc.creator_id,
        source_branch: doc.source_branch,
        target_branch: doc.target_branch,
        collab_state: doc.collab_state,
        labels: doc.labels.into_iter().map(|l| l.name).collect(),
        assignee_ids: doc.assignee_ids,
        reviewer_ids: doc.reviewer_ids,
        approver_ids: doc.approver_ids,
        additions: doc.additions.unwrap_or(0),
        deletions: doc.deletions.unwrap_or(0),
        changes: doc.changes.unwrap_or(0),
        files_count: doc.files_count,
        comment_count: doc.comment_count,
        cycle_time: doc.cycle_time,
        created_at: millis_to_secs(doc.created_at),
        merged_at: millis_to_secs(doc.merged_at),
        closed_at: millis_to_secs(doc.closed_at),
        updated_at: millis_to_secs(doc.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_uses_distinct_prs() {
        let raw = json!({
            "doc_count": 7,
            "pr_count": { "value": 5.0 },
            "additions": { "value": 40.0 },
            "deletions": { "value": 10.0 },
            "changes": { "value": 50.0 },
            "files_ct": { "value": 9.0 },
            "comment_ct": { "value": 12.0 }
        });
        let mut row = AggregationResult::new("repo-1", 7);
        fill_metrics(&mut row, AggregateView::new(&raw), PrCalculation::Count);
        assert_eq!(row.count, 5);
        assert_eq!(row.lines_changed_count, Some(50));
        assert_eq!(row.comment_count, Some(12));
        assert_eq!(row.avg_change_size, Some(10.0));
    }

    #[test]
    fn test_duration_stats() {
        let raw = json!({
            "doc_count": 3,
            "stats": { "count": 3, "min": 60.0, "max": 600.0, "avg": 300.0, "sum": 900.0 },
            "median": { "values": { "50.0": 240.0 } }
        });
        let mut row = AggregationResult::new("alice", 3);
        fill_metrics(&mut row, AggregateView::new(&raw), PrCalculation::MergeTime);
        assert_eq!(row.count, 3);
        assert_eq!(row.min, Some(60.0));
        assert_eq!(row.max, Some(600.0));
        assert_eq!(row.mean, Some(300.0));
        assert_eq!(row.sum, Some(900.0));
        assert_eq!(row.median, Some(240.0));
        assert_eq!(row.lines_added_count, None);
    }

    #[test]
    fn test_collab_key_parse() {
        let key = CollabKey::parse("u1#Alice#unapproved").unwrap();
        assert_eq!(key.creator_id, "u1");
        assert_eq!(key.creator, "Alice");
        assert_eq!(key.collab_state, "unapproved");
        assert!(CollabKey::parse("u1#Alice").is_none());
        assert_eq!(CollabKey::parse("##").unwrap().creator_id, "");
    }

    #[test]
    fn test_record_defaults_line_counts() {
        let doc: PrDocument = serde_json::from_value(json!({
            "pr_title": "Fix it",
            "pr_labels": [ { "name": "bug" } ],
            "pr_updated_at": 1_700_000_000_500_i64
        }))
        .unwrap();
        let record = to_record("p-1".to_string(), doc);
        assert_eq!(record.id, "p-1");
        assert_eq!(record.labels, vec!["bug".to_string()]);
        assert_eq!((record.additions, record.deletions, record.changes), (0, 0, 0));
        assert_eq!(record.updated_at, Some(1_700_000_000));
    }
}
