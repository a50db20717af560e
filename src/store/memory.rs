//! In-memory relational store for embedding and tests

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{IntegrationUser, RelationalStore};
use crate::error::StoreError;
use crate::ou::OuConfig;

#[derive(Debug, Default)]
struct TenantData {
    users: Vec<IntegrationUser>,
    /// ou_ref_id -> member user ids
    ou_members: HashMap<String, Vec<String>>,
}

/// Store backed by process memory
///
/// Counts reads so callers can verify caching, and can be switched into an
/// unavailable state to exercise degradation paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<String, TenantData>>,
    unavailable: AtomicBool,
    identity_reads: AtomicU64,
    ou_reads: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integration user to a tenant
    pub fn add_user(&self, tenant: &str, user: IntegrationUser) {
        self.tenants
            .write()
            .entry(tenant.to_string())
            .or_default()
            .users
            .push(user);
    }

    /// Add `user_id` to the OU `ou_ref_id`
    pub fn add_ou_member(&self, tenant: &str, ou_ref_id: &str, user_id: &str) {
        self.tenants
            .write()
            .entry(tenant.to_string())
            .or_default()
            .ou_members
            .entry(ou_ref_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    /// Make every subsequent read fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of identity reads served so far
    pub fn identity_reads(&self) -> u64 {
        self.identity_reads.load(Ordering::Relaxed)
    }

    /// Number of OU reads served so far
    pub fn ou_reads(&self) -> u64 {
        self.ou_reads.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl RelationalStore for InMemoryStore {
    fn identity_pairs(&self, tenant: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.identity_reads.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let tenants = self.tenants.read();
        Ok(tenants
            .get(tenant)
            .map(|data| {
                data.users
                    .iter()
                    .map(|u| (u.id.clone(), u.cloud_id.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn ou_member_ids(
        &self,
        tenant: &str,
        ou: &OuConfig,
        integration_types: &[&str],
    ) -> Result<Vec<String>, StoreError> {
        self.ou_reads.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let tenants = self.tenants.read();
        let Some(data) = tenants.get(tenant) else {
            return Ok(Vec::new());
        };

        let members: BTreeSet<&str> = ou
            .ou_ref_ids
            .iter()
            .filter_map(|ou_id| data.ou_members.get(ou_id))
            .flatten()
            .map(String::as_str)
            .collect();

        Ok(data
            .users
            .iter()
            .filter(|u| members.contains(u.id.as_str()))
            .filter(|u| integration_types.contains(&u.integration_type.as_str()))
            .map(|u| u.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ou::OuRole;

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_user("acme", IntegrationUser::new("u1", "alice@gh", "github"));
        store.add_user("acme", IntegrationUser::new("u2", "bob@jira", "jira"));
        store.add_user("acme", IntegrationUser::new("u3", "carol@gl", "gitlab"));
        store.add_ou_member("acme", "ou-1", "u1");
        store.add_ou_member("acme", "ou-1", "u2");
        store
    }

    #[test]
    fn test_identity_pairs_per_tenant() {
        let store = seeded();
        assert_eq!(store.identity_pairs("acme").unwrap().len(), 3);
        assert!(store.identity_pairs("other").unwrap().is_empty());
        assert_eq!(store.identity_reads(), 2);
    }

    #[test]
    fn test_ou_members_filtered_by_integration_type() {
        let store = seeded();
        let ou = OuConfig::new(["ou-1"], [OuRole::Author]);
        let ids = store.ou_member_ids("acme", &ou, &["github", "gitlab"]).unwrap();
        assert_eq!(ids, vec!["u1".to_string()]);
    }

    #[test]
    fn test_unavailable_store_fails() {
        let store = seeded();
        store.set_unavailable(true);
        assert!(matches!(store.identity_pairs("acme"), Err(StoreError::Unavailable(_))));
    }
}
