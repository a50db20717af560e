//! Issue (work item) filter

use serde::{Deserialize, Serialize};

use super::{narrowed_range, Calculation, Dimension, FilterModel, Grouping, PartialMatches};
use crate::ou::OuRole;
use crate::types::{AggInterval, TimeRange, ValueRange};

named_enum! {
    /// Grouping dimensions over issues
    IssueDimension {
        /// Project
        Project => "project",
        /// Workflow status
        Status => "status",
        /// Status category
        StatusCategory => "status_category",
        /// Priority
        Priority => "priority",
        /// Issue type
        IssueType => "issue_type",
        /// Assignee id
        Assignee => "assignee",
        /// Reporter id
        Reporter => "reporter",
        /// Epic
        Epic => "epic",
        /// Resolution
        Resolution => "resolution",
        /// Label (array field)
        Label => "label",
        /// Component (array field)
        Component => "component",
        /// Creation date bucket
        IssueCreated => "issue_created",
        /// Last update date bucket
        IssueUpdated => "issue_updated",
        /// Resolution date bucket
        IssueResolved => "issue_resolved",
        /// Creation trend
        Trend => "trend",
    }
}

named_enum! {
    /// Per-bucket calculations over issues
    IssueCalculation {
        /// Issue count
        TicketCount => "ticket_count",
        /// Story point totals
        StoryPoints => "story_points",
        /// Age statistics
        Age => "age",
    }
}

impl Default for IssueCalculation {
    fn default() -> Self {
        IssueCalculation::TicketCount
    }
}

impl Dimension for IssueDimension {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn parse(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn is_time(&self) -> bool {
        matches!(
            self,
            IssueDimension::IssueCreated
                | IssueDimension::IssueUpdated
                | IssueDimension::IssueResolved
                | IssueDimension::Trend
        )
    }

    fn identity_role(&self) -> Option<OuRole> {
        match self {
            IssueDimension::Assignee => Some(OuRole::Assignee),
            IssueDimension::Reporter => Some(OuRole::Reporter),
            _ => None,
        }
    }
}

impl Calculation for IssueCalculation {
    fn name(&self) -> &'static str {
        self.as_str()
    }
}

/// Include or exclude criteria over issues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueCriteria {
    /// Integration ids
    pub integration_ids: Vec<String>,
    /// Projects
    pub projects: Vec<String>,
    /// Statuses
    pub statuses: Vec<String>,
    /// Status categories
    pub status_categories: Vec<String>,
    /// Priorities
    pub priorities: Vec<String>,
    /// Issue types
    pub issue_types: Vec<String>,
    /// Assignee ids
    pub assignees: Vec<String>,
    /// Reporter ids
    pub reporters: Vec<String>,
    /// Epics
    pub epics: Vec<String>,
    /// Resolutions
    pub resolutions: Vec<String>,
    /// Labels
    pub labels: Vec<String>,
    /// Components
    pub components: Vec<String>,
    /// Issue keys
    pub keys: Vec<String>,
}

/// Query over issue documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFilter {
    /// Grouping envelope
    #[serde(flatten)]
    pub grouping: Grouping<IssueDimension, IssueCalculation>,

    /// Include criteria
    #[serde(default)]
    pub include: IssueCriteria,

    /// Exclude criteria
    #[serde(default)]
    pub exclude: IssueCriteria,

    /// Creation time, epoch seconds
    #[serde(default)]
    pub created_at: TimeRange,

    /// Last update time, epoch seconds
    #[serde(default)]
    pub updated_at: TimeRange,

    /// Resolution time, epoch seconds
    #[serde(default)]
    pub resolved_at: TimeRange,

    /// Story point bounds, exclusive
    #[serde(default)]
    pub story_points: ValueRange,

    /// Partial matches on project, summary, key
    #[serde(default)]
    pub partial_match: PartialMatches,
}

impl FilterModel for IssueFilter {
    type Dimension = IssueDimension;
    type Calculation = IssueCalculation;

    fn grouping(&self) -> &Grouping<IssueDimension, IssueCalculation> {
        &self.grouping
    }

    fn grouping_mut(&mut self) -> &mut Grouping<IssueDimension, IssueCalculation> {
        &mut self.grouping
    }

    fn role_ids(&self, role: OuRole) -> Option<&[String]> {
        match role {
            OuRole::Assignee => Some(&self.include.assignees),
            OuRole::Reporter => Some(&self.include.reporters),
            _ => None,
        }
    }

    fn with_role_ids(&self, role: OuRole, ids: Vec<String>) -> Self {
        let mut next = self.clone();
        match role {
            OuRole::Assignee => next.include.assignees = ids,
            OuRole::Reporter => next.include.reporters = ids,
            _ => {}
        }
        next
    }

    fn narrowed(&self, dim: IssueDimension, key: &str, interval: AggInterval) -> Option<Self> {
        let mut next = self.clone();
        let only = vec![key.to_string()];
        match dim {
            IssueDimension::Project => next.include.projects = only,
            IssueDimension::Status => next.include.statuses = only,
            IssueDimension::StatusCategory => next.include.status_categories = only,
            IssueDimension::Priority => next.include.priorities = only,
            IssueDimension::IssueType => next.include.issue_types = only,
            IssueDimension::Assignee => next.include.assignees = only,
            IssueDimension::Reporter => next.include.reporters = only,
            IssueDimension::Epic => next.include.epics = only,
            IssueDimension::Resolution => next.include.resolutions = only,
            IssueDimension::Label => next.include.labels = only,
            IssueDimension::Component => next.include.components = only,
            IssueDimension::IssueCreated | IssueDimension::Trend => {
                next.created_at = narrowed_range(key, interval)?
            }
            IssueDimension::IssueUpdated => next.updated_at = narrowed_range(key, interval)?,
            IssueDimension::IssueResolved => next.resolved_at = narrowed_range(key, interval)?,
        }
        Some(next)
    }
}
