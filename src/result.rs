//! Result rows
//!
//! [`AggregationResult`] is the normalized row of every group-by, one per
//! bucket. Metric fields are optional and only populated by the
//! calculations that produce them. `stacks` holds the drill-down rows and
//! is filled at most once, by the stack executor.
//!
//! List endpoints return per-document records wrapped in [`ListResponse`].

use serde::{Deserialize, Serialize};

/// Display key of rows whose identity or drill-down is unknown
pub const NONE_KEY: &str = "NONE";

/// One aggregated bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Bucket value (raw id, name, or bucket start in epoch seconds)
    pub key: String,

    /// Display value: external id for identity dimensions, label for time buckets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_key: Option<String>,

    /// Collaboration state, collaboration report only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collab_state: Option<String>,

    /// Documents in the bucket
    pub count: u64,

    /// Files touched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed_count: Option<i64>,

    /// Lines added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_added_count: Option<i64>,

    /// Lines removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_removed_count: Option<i64>,

    /// Lines changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_changed_count: Option<i64>,

    /// Median of the calculation's metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,

    /// Mean of the calculation's metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,

    /// Minimum of the calculation's metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Maximum of the calculation's metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Sum of the calculation's metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,

    /// Lines changed per commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_change_size: Option<f64>,

    /// Share of new lines, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_new_lines: Option<f64>,

    /// Share of refactored lines, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_refactored_lines: Option<f64>,

    /// Share of legacy lines, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_legacy_lines: Option<f64>,

    /// Distinct days with at least one commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_days: Option<u64>,

    /// Lines changed across the bucket's commits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_size: Option<i64>,

    /// Comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,

    /// Story points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,

    /// Drill-down rows
    #[serde(default)]
    pub stacks: Vec<AggregationResult>,
}

impl AggregationResult {
    /// Row with a key and a count
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
            ..Default::default()
        }
    }

    /// Set the display key
    pub fn with_additional_key(mut self, additional_key: impl Into<String>) -> Self {
        self.additional_key = Some(additional_key.into());
        self
    }

    /// Activity signal used to rank rows before drill-down capping:
    /// added + removed + changed lines, or the document count when the row
    /// carries no line figures.
    pub fn churn(&self) -> i64 {
        let lines = [
            self.lines_added_count,
            self.lines_removed_count,
            self.lines_changed_count,
        ];
        if lines.iter().all(Option::is_none) {
            return i64::try_from(self.count).unwrap_or(i64::MAX);
        }
        lines.iter().flatten().fold(0i64, |acc, v| acc.saturating_add(*v))
    }
}

/// A page of rows with the total across all pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Rows of the requested page
    pub records: Vec<T>,
    /// Total matching rows
    pub count: u64,
}

impl<T> ListResponse<T> {
    /// Create a response
    pub fn new(records: Vec<T>, count: u64) -> Self {
        Self { records, count }
    }

    /// Empty response
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            count: 0,
        }
    }

    /// Transform every record
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResponse<U> {
        ListResponse {
            records: self.records.into_iter().map(f).collect(),
            count: self.count,
        }
    }
}

/// Commit listing row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Document id
    pub id: String,
    /// Commit SHA
    pub commit_sha: String,
    /// Repository
    pub repo_id: String,
    /// Project
    pub project: Option<String>,
    /// Branch
    pub branch: Option<String>,
    /// VCS type
    pub vcs_type: Option<String>,
    /// Author display name
    pub author: Option<String>,
    /// Author internal id
    pub author_id: Option<String>,
    /// Committer display name
    pub committer: Option<String>,
    /// Committer internal id
    pub committer_id: Option<String>,
    /// Commit message
    pub message: Option<String>,
    /// Changed file extensions
    pub file_types: Vec<String>,
    /// Files changed
    pub files_ct: i64,
    /// Lines added
    pub additions: i64,
    /// Lines removed
    pub deletions: i64,
    /// Lines changed
    pub changes: i64,
    /// Commit time, epoch seconds
    pub committed_at: Option<i64>,
    /// Ingestion time, epoch seconds
    pub created_at: Option<i64>,
    /// Derived: lines across all change records
    pub total_lines_changed: i64,
    /// Derived: lines with no prior revision
    pub new_lines: i64,
    /// Derived: lines whose prior revision is after the legacy cutoff
    pub refactored_lines: i64,
    /// Derived: lines whose prior revision is at or before the legacy cutoff
    pub legacy_lines: i64,
    /// Derived: percent of new lines
    pub pct_new_lines: f64,
    /// Derived: percent of refactored lines
    pub pct_refactored_lines: f64,
    /// Derived: percent of legacy lines
    pub pct_legacy_lines: f64,
}

/// Commit activity of one contributor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributorRecord {
    /// Internal user id
    pub id: String,
    /// Display name as recorded on the commits
    pub name: Option<String>,
    /// Distinct commits
    pub num_commits: u64,
    /// Distinct repositories committed to
    pub num_repos: u64,
    /// Lines added
    pub num_additions: i64,
    /// Lines removed
    pub num_deletions: i64,
    /// Lines changed
    pub num_changes: i64,
    /// File extensions touched
    pub file_types: Vec<String>,
    /// Repositories committed to
    pub repo_breadth: Vec<String>,
    /// Technologies detected on the commits
    pub tech_breadth: Vec<String>,
}

/// Commit activity of one file type or repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// File extension or repository id
    pub name: String,
    /// Distinct commits
    pub num_commits: u64,
    /// Lines added
    pub num_additions: i64,
    /// Lines removed
    pub num_deletions: i64,
    /// Lines changed
    pub num_changes: i64,
}

/// Change activity of one file path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path within its repository
    pub file_name: String,
    /// Commits touching the file
    pub num_commits: u64,
    /// Repositories containing the path
    pub repo_ids: Vec<String>,
    /// Lines added
    pub num_additions: i64,
    /// Lines removed
    pub num_deletions: i64,
    /// Lines changed
    pub num_changes: i64,
}

/// Pull request listing row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    /// Document id
    pub id: String,
    /// Number in the source system
    pub number: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Repository
    pub repo_id: Option<String>,
    /// Project
    pub project: Option<String>,
    /// State
    pub state: Option<String>,
    /// Creator display name
    pub creator: Option<String>,
    /// Creator internal id
    pub creator_id: Option<String>,
    /// Source branch
    pub source_branch: Option<String>,
    /// Target branch
    pub target_branch: Option<String>,
    /// Collaboration state
    pub collab_state: Option<String>,
    /// Labels
    pub labels: Vec<String>,
    /// Assignee ids
    pub assignee_ids: Vec<String>,
    /// Reviewer ids
    pub reviewer_ids: Vec<String>,
    /// Approver ids
    pub approver_ids: Vec<String>,
    /// Lines added, zero when unknown
    pub additions: i64,
    /// Lines removed, zero when unknown
    pub deletions: i64,
    /// Lines changed, zero when unknown
    pub changes: i64,
    /// Files changed
    pub files_count: Option<i64>,
    /// Comments
    pub comment_count: Option<i64>,
    /// Cycle time, seconds
    pub cycle_time: Option<i64>,
    /// Creation time, epoch seconds
    pub created_at: Option<i64>,
    /// Merge time, epoch seconds
    pub merged_at: Option<i64>,
    /// Close time, epoch seconds
    pub closed_at: Option<i64>,
    /// Last update, epoch seconds
    pub updated_at: Option<i64>,
}

/// Issue listing row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Document id
    pub id: String,
    /// Issue key
    pub key: Option<String>,
    /// Summary
    pub summary: Option<String>,
    /// Project
    pub project: Option<String>,
    /// Status
    pub status: Option<String>,
    /// Status category
    pub status_category: Option<String>,
    /// Priority
    pub priority: Option<String>,
    /// Issue type
    pub issue_type: Option<String>,
    /// Assignee internal id
    pub assignee_id: Option<String>,
    /// Reporter internal id
    pub reporter_id: Option<String>,
    /// Epic
    pub epic: Option<String>,
    /// Labels
    pub labels: Vec<String>,
    /// Components
    pub components: Vec<String>,
    /// Story points
    pub story_points: Option<f64>,
    /// Age in days
    pub age: Option<i64>,
    /// Creation time, epoch seconds
    pub created_at: Option<i64>,
    /// Last update, epoch seconds
    pub updated_at: Option<i64>,
    /// Resolution time, epoch seconds
    pub resolved_at: Option<i64>,
}
