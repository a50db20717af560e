//! Commit filter

use serde::{Deserialize, Serialize};

use super::{narrowed_range, Calculation, Dimension, FilterModel, Grouping, PartialMatches, SizeThresholds};
use crate::ou::OuRole;
use crate::types::{AggInterval, TimeRange, ValueRange};

named_enum! {
    /// Grouping dimensions over commits
    CommitDimension {
        /// Author id
        Author => "author",
        /// Committer id
        Committer => "committer",
        /// Repository
        RepoId => "repo_id",
        /// Project
        Project => "project",
        /// Changed file extension
        FileType => "file_type",
        /// Branch
        CommitBranch => "commit_branch",
        /// Version control system
        VcsType => "vcs_type",
        /// Detected technology (nested)
        Technology => "technology",
        /// Commit date bucket
        Trend => "trend",
        /// small / medium / large by lines changed
        CodeChange => "code_change",
    }
}

named_enum! {
    /// Per-bucket calculations over commits
    CommitCalculation {
        /// Commit count with line and file totals
        Count => "count",
        /// Commit-level line totals with median change size
        CommitCount => "commit_count",
        /// Active coding days
        CommitDays => "commit_days",
    }
}

named_enum! {
    /// Identity a contributor listing groups commits by
    ContributorRole {
        /// Author id
        Author => "author",
        /// Committer id
        Committer => "committer",
    }
}

named_enum! {
    /// Grouping of the commit activity listing
    ActivityAcross {
        /// Changed file extension
        FileType => "file_type",
        /// Repository
        RepoId => "repo_id",
    }
}

impl Default for CommitCalculation {
    fn default() -> Self {
        CommitCalculation::Count
    }
}

impl Dimension for CommitDimension {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn parse(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn is_time(&self) -> bool {
        matches!(self, CommitDimension::Trend)
    }

    fn identity_role(&self) -> Option<OuRole> {
        match self {
            CommitDimension::Author => Some(OuRole::Author),
            CommitDimension::Committer => Some(OuRole::Committer),
            _ => None,
        }
    }
}

impl Calculation for CommitCalculation {
    fn name(&self) -> &'static str {
        self.as_str()
    }
}

/// Include or exclude criteria over commits. Empty lists constrain nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitCriteria {
    /// Integration ids
    pub integration_ids: Vec<String>,
    /// Repository ids
    pub repo_ids: Vec<String>,
    /// Projects
    pub projects: Vec<String>,
    /// Commit SHAs
    pub commit_shas: Vec<String>,
    /// Branches
    pub branches: Vec<String>,
    /// File extensions
    pub file_types: Vec<String>,
    /// Technology names
    pub technologies: Vec<String>,
    /// VCS types
    pub vcs_types: Vec<String>,
    /// Author ids
    pub authors: Vec<String>,
    /// Committer ids
    pub committers: Vec<String>,
    /// Commit messages
    pub commit_titles: Vec<String>,
    /// Weekday names
    pub days_of_week: Vec<String>,
}

/// Query over commit documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitFilter {
    /// Grouping envelope
    #[serde(flatten)]
    pub grouping: Grouping<CommitDimension, CommitCalculation>,

    /// Include criteria
    #[serde(default)]
    pub include: CommitCriteria,

    /// Exclude criteria
    #[serde(default)]
    pub exclude: CommitCriteria,

    /// Commit time, epoch seconds
    #[serde(default)]
    pub committed_at: TimeRange,

    /// Lines-of-code bounds, exclusive
    #[serde(default)]
    pub loc: ValueRange,

    /// Partial matches on repo_id, project, branch, message
    #[serde(default)]
    pub partial_match: PartialMatches,

    /// small / medium / large thresholds
    #[serde(default)]
    pub code_change_size: SizeThresholds,

    /// Refactored vs legacy cutoff in epoch seconds, for listings
    #[serde(default)]
    pub legacy_cutoff: Option<i64>,
}

impl FilterModel for CommitFilter {
    type Dimension = CommitDimension;
    type Calculation = CommitCalculation;

    fn grouping(&self) -> &Grouping<CommitDimension, CommitCalculation> {
        &self.grouping
    }

    fn grouping_mut(&mut self) -> &mut Grouping<CommitDimension, CommitCalculation> {
        &mut self.grouping
    }

    fn role_ids(&self, role: OuRole) -> Option<&[String]> {
        match role {
            OuRole::Author => Some(&self.include.authors),
            OuRole::Committer => Some(&self.include.committers),
            _ => None,
        }
    }

    fn with_role_ids(&self, role: OuRole, ids: Vec<String>) -> Self {
        let mut next = self.clone();
        match role {
            OuRole::Author => next.include.authors = ids,
            OuRole::Committer => next.include.committers = ids,
            _ => {}
        }
        next
    }

    fn narrowed(&self, dim: CommitDimension, key: &str, interval: AggInterval) -> Option<Self> {
        let mut next = self.clone();
        let only = vec![key.to_string()];
        match dim {
            CommitDimension::Author => next.include.authors = only,
            CommitDimension::Committer => next.include.committers = only,
            CommitDimension::CommitBranch => next.include.branches = only,
            CommitDimension::RepoId => next.include.repo_ids = only,
            CommitDimension::Project => next.include.projects = only,
            CommitDimension::VcsType => next.include.vcs_types = only,
            CommitDimension::FileType => next.include.file_types = only,
            CommitDimension::Trend => next.committed_at = narrowed_range(key, interval)?,
            CommitDimension::Technology | CommitDimension::CodeChange => return None,
        }
        Some(next)
    }
}
