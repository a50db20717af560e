//! Pull request filter

use serde::{Deserialize, Serialize};

use super::{narrowed_range, Calculation, Dimension, FilterModel, Grouping, PartialMatches, SizeThresholds};
use crate::ou::OuRole;
use crate::types::{AggInterval, TimeRange};

named_enum! {
    /// Grouping dimensions over pull requests
    PrDimension {
        /// Repository
        RepoId => "repo_id",
        /// Project
        Project => "project",
        /// Alias of `source_branch`
        Branch => "branch",
        /// Source branch
        SourceBranch => "source_branch",
        /// Target branch
        TargetBranch => "target_branch",
        /// State (open, merged, ...)
        State => "state",
        /// Label (nested)
        Label => "label",
        /// Creator id
        Creator => "creator",
        /// Assignee id
        Assignee => "assignee",
        /// Reviewer id
        Reviewer => "reviewer",
        /// Approver id
        Approver => "approver",
        /// Collaboration state
        CollabState => "collab_state",
        /// Review type
        ReviewType => "review_type",
        /// Approval status
        ApprovalStatus => "approval_status",
        /// small / medium / large by lines changed
        CodeChange => "code_change",
        /// shallow / good / heavy by comment count
        CommentDensity => "comment_density",
        /// Creation date bucket
        PrCreated => "pr_created",
        /// Merge date bucket
        PrMerged => "pr_merged",
        /// Close date bucket
        PrClosed => "pr_closed",
        /// Last update date bucket
        PrUpdated => "pr_updated",
    }
}

named_enum! {
    /// Per-bucket calculations over pull requests
    PrCalculation {
        /// Distinct PR count with line, file and comment totals
        Count => "count",
        /// Cycle time
        MergeTime => "merge_time",
        /// Author response time
        AuthorResponseTime => "author_response_time",
        /// Reviewer response time
        ReviewerResponseTime => "reviewer_response_time",
        /// Time to approval
        ReviewerApproveTime => "reviewer_approve_time",
        /// Time to first comment
        ReviewerCommentTime => "reviewer_comment_time",
    }
}

impl Default for PrCalculation {
    fn default() -> Self {
        PrCalculation::Count
    }
}

impl PrCalculation {
    /// Duration field behind a duration calculation
    pub fn duration_field(&self) -> Option<&'static str> {
        match self {
            PrCalculation::Count => None,
            PrCalculation::MergeTime => Some("pr_cycle_time"),
            PrCalculation::AuthorResponseTime => Some("pr_avg_author_response_time"),
            PrCalculation::ReviewerResponseTime => Some("pr_avg_reviewer_response_time"),
            PrCalculation::ReviewerApproveTime => Some("pr_approval_time"),
            PrCalculation::ReviewerCommentTime => Some("pr_comment_time"),
        }
    }
}

impl Dimension for PrDimension {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn parse(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn is_time(&self) -> bool {
        matches!(
            self,
            PrDimension::PrCreated | PrDimension::PrMerged | PrDimension::PrClosed | PrDimension::PrUpdated
        )
    }

    fn identity_role(&self) -> Option<OuRole> {
        match self {
            PrDimension::Creator => Some(OuRole::Creator),
            PrDimension::Assignee => Some(OuRole::Assignee),
            PrDimension::Reviewer => Some(OuRole::Reviewer),
            PrDimension::Approver => Some(OuRole::Approver),
            _ => None,
        }
    }
}

impl Calculation for PrCalculation {
    fn name(&self) -> &'static str {
        self.as_str()
    }
}

/// Include or exclude criteria over pull requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrCriteria {
    /// Integration ids
    pub integration_ids: Vec<String>,
    /// Repository ids
    pub repo_ids: Vec<String>,
    /// Projects
    pub projects: Vec<String>,
    /// Source branches
    pub source_branches: Vec<String>,
    /// Target branches
    pub target_branches: Vec<String>,
    /// States
    pub states: Vec<String>,
    /// Labels
    pub labels: Vec<String>,
    /// Creator ids
    pub creators: Vec<String>,
    /// Assignee ids
    pub assignees: Vec<String>,
    /// Reviewer ids
    pub reviewers: Vec<String>,
    /// Approver ids
    pub approvers: Vec<String>,
    /// Collaboration states
    pub collab_states: Vec<String>,
    /// Review types
    pub review_types: Vec<String>,
    /// Approval statuses
    pub approval_statuses: Vec<String>,
    /// small / medium / large
    pub code_changes: Vec<String>,
    /// shallow / good / heavy
    pub comment_densities: Vec<String>,
}

/// Query over pull request documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrFilter {
    /// Grouping envelope
    #[serde(flatten)]
    pub grouping: Grouping<PrDimension, PrCalculation>,

    /// Include criteria
    #[serde(default)]
    pub include: PrCriteria,

    /// Exclude criteria
    #[serde(default)]
    pub exclude: PrCriteria,

    /// Creation time, epoch seconds
    #[serde(default)]
    pub created_at: TimeRange,

    /// Merge time, epoch seconds
    #[serde(default)]
    pub merged_at: TimeRange,

    /// Close time, epoch seconds
    #[serde(default)]
    pub closed_at: TimeRange,

    /// Last update time, epoch seconds
    #[serde(default)]
    pub updated_at: TimeRange,

    /// Partial matches on repo_id, project, source_branch, target_branch, title
    #[serde(default)]
    pub partial_match: PartialMatches,

    /// small / medium / large thresholds on lines changed
    #[serde(default)]
    pub code_change_size: SizeThresholds,

    /// shallow / good / heavy thresholds on comment count
    #[serde(default)]
    pub comment_density_size: SizeThresholds,
}

impl PrFilter {
    fn time_range_mut(&mut self, dim: PrDimension) -> Option<&mut TimeRange> {
        match dim {
            PrDimension::PrCreated => Some(&mut self.created_at),
            PrDimension::PrMerged => Some(&mut self.merged_at),
            PrDimension::PrClosed => Some(&mut self.closed_at),
            PrDimension::PrUpdated => Some(&mut self.updated_at),
            _ => None,
        }
    }
}

impl FilterModel for PrFilter {
    type Dimension = PrDimension;
    type Calculation = PrCalculation;

    fn grouping(&self) -> &Grouping<PrDimension, PrCalculation> {
        &self.grouping
    }

    fn grouping_mut(&mut self) -> &mut Grouping<PrDimension, PrCalculation> {
        &mut self.grouping
    }

    fn role_ids(&self, role: OuRole) -> Option<&[String]> {
        match role {
            OuRole::Creator => Some(&self.include.creators),
            OuRole::Assignee => Some(&self.include.assignees),
            OuRole::Reviewer => Some(&self.include.reviewers),
            OuRole::Approver => Some(&self.include.approvers),
            _ => None,
        }
    }

    fn with_role_ids(&self, role: OuRole, ids: Vec<String>) -> Self {
        let mut next = self.clone();
        match role {
            OuRole::Creator => next.include.creators = ids,
            OuRole::Assignee => next.include.assignees = ids,
            OuRole::Reviewer => next.include.reviewers = ids,
            OuRole::Approver => next.include.approvers = ids,
            _ => {}
        }
        next
    }

    fn narrowed(&self, dim: PrDimension, key: &str, interval: AggInterval) -> Option<Self> {
        let mut next = self.clone();
        let only = vec![key.to_string()];
        let criteria = &mut next.include;
        match dim {
            PrDimension::RepoId => criteria.repo_ids = only,
            PrDimension::Project => criteria.projects = only,
            PrDimension::Branch | PrDimension::SourceBranch => criteria.source_branches = only,
            PrDimension::TargetBranch => criteria.target_branches = only,
            PrDimension::State => criteria.states = only,
            PrDimension::Label => criteria.labels = only,
            PrDimension::Creator => criteria.creators = only,
            PrDimension::Assignee => criteria.assignees = only,
            PrDimension::Reviewer => criteria.reviewers = only,
            PrDimension::Approver => criteria.approvers = only,
            PrDimension::CollabState => criteria.collab_states = only,
            PrDimension::ReviewType => criteria.review_types = only,
            PrDimension::ApprovalStatus => criteria.approval_statuses = only,
            PrDimension::CodeChange => criteria.code_changes = only,
            PrDimension::CommentDensity => criteria.comment_densities = only,
            PrDimension::PrCreated | PrDimension::PrMerged | PrDimension::PrClosed | PrDimension::PrUpdated => {
                let range = narrowed_range(key, interval)?;
                if let Some(slot) = next.time_range_mut(dim) {
                    *slot = range;
                }
            }
        }
        Some(next)
    }
}
