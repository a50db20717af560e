//! Organizational-unit scoping
//!
//! An [`OuConfig`] names one or more organizational units and the identity
//! roles their membership constrains. The [`OuResolver`] turns it into a
//! concrete id list with one store round-trip and merges that list into the
//! include-list of every relevant role of a filter.
//!
//! An OU that resolves to nobody leaves the filter untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::filter::FilterModel;
use crate::store::RelationalStore;

/// Identity role an OU can constrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OuRole {
    /// Commit author
    Author,
    /// Commit committer
    Committer,
    /// Pull request creator
    Creator,
    /// Pull request / issue assignee
    Assignee,
    /// Pull request reviewer
    Reviewer,
    /// Pull request approver
    Approver,
    /// Issue reporter
    Reporter,
}

/// Reference to an organizational-unit scoping rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuConfig {
    /// Organizational units whose members are included
    pub ou_ref_ids: Vec<String>,
    /// Roles the OU membership applies to
    #[serde(default)]
    pub roles: BTreeSet<OuRole>,
}

impl OuConfig {
    /// OU config over `ou_ref_ids` constraining `roles`
    pub fn new<I, S, R>(ou_ref_ids: I, roles: R) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = OuRole>,
    {
        Self {
            ou_ref_ids: ou_ref_ids.into_iter().map(Into::into).collect(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Constrains `role`
    pub fn has(&self, role: OuRole) -> bool {
        self.roles.contains(&role)
    }

    /// Copy without `role`
    pub fn without(&self, role: OuRole) -> Self {
        let mut next = self.clone();
        next.roles.remove(&role);
        next
    }

    /// Copy constraining only `roles`
    pub fn with_roles<R: IntoIterator<Item = OuRole>>(&self, roles: R) -> Self {
        Self {
            ou_ref_ids: self.ou_ref_ids.clone(),
            roles: roles.into_iter().collect(),
        }
    }
}

/// Document-kind specific OU behavior
pub trait OuScope {
    /// Integration types whose users count as members for this kind
    const INTEGRATION_TYPES: &'static [&'static str];

    /// Roles of `ou` that apply to this kind, in merge order
    fn ou_roles(ou: &OuConfig) -> Vec<OuRole>;
}

/// Integration types of source-control documents
pub const SCM_INTEGRATION_TYPES: &[&str] = &[
    "github",
    "gitlab",
    "bitbucket",
    "bitbucket_server",
    "azure_devops",
    "gerrit",
    "helix",
];

/// Integration types of issue-tracker documents
pub const ISSUE_INTEGRATION_TYPES: &[&str] = &["jira", "azure_devops"];

/// Resolves OU configs against the relational store
#[derive(Clone)]
pub struct OuResolver {
    store: Arc<dyn RelationalStore>,
}

impl OuResolver {
    /// Create a resolver over `store`
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Merge `ou` into `filter`.
    ///
    /// The store is only queried when `ou` constrains a role of this kind.
    /// Each such role's include-list is replaced by the resolved ids; an empty
    /// resolution leaves the filter as it was. Store failures propagate.
    pub fn merge<F, S>(&self, tenant: &str, filter: &F, ou: &OuConfig) -> Result<F>
    where
        F: FilterModel,
        S: OuScope,
    {
        let roles = S::ou_roles(ou);
        if roles.is_empty() {
            return Ok(filter.clone());
        }

        let ids = self.store.ou_member_ids(tenant, ou, S::INTEGRATION_TYPES)?;
        debug!(tenant, ?roles, resolved = ids.len(), "Merged OU config");
        if ids.is_empty() {
            return Ok(filter.clone());
        }

        Ok(roles
            .into_iter()
            .fold(filter.clone(), |acc, role| acc.with_role_ids(role, ids.clone())))
    }
}
