//! Relational identity / OU store
//!
//! The engine needs exactly two reads from the relational side:
//!
//! - `(internal_id, external_id)` pairs per tenant, feeding the identity cache
//! - member ids of an organizational unit, filtered by integration type,
//!   feeding the OU resolver
//!
//! Both implementations are synchronous and `Send + Sync`, so a single store
//! handle is shared by every stacking branch.

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use crate::ou::OuConfig;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Relational lookups consumed by the engine
pub trait RelationalStore: Send + Sync {
    /// Every `(internal_id, external_id)` pair of the tenant
    fn identity_pairs(&self, tenant: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Internal ids of the users that belong to `ou`, restricted to the
    /// given integration types
    fn ou_member_ids(
        &self,
        tenant: &str,
        ou: &OuConfig,
        integration_types: &[&str],
    ) -> Result<Vec<String>, StoreError>;
}

/// One integration user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationUser {
    /// Internal surrogate id
    pub id: String,
    /// Native id in the source system
    pub cloud_id: String,
    /// Source system (`github`, `jira`, ...)
    pub integration_type: String,
}

impl IntegrationUser {
    /// Create a user row
    pub fn new(
        id: impl Into<String>,
        cloud_id: impl Into<String>,
        integration_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cloud_id: cloud_id.into(),
            integration_type: integration_type.into(),
        }
    }
}
