//! Per-tenant identity cache
//!
//! Maps internal user ids to external (cloud) ids. Each tenant's map is
//! loaded with one bulk read on first use and kept in an LRU bounded by
//! tenant count. Entries are never invalidated except by eviction; the
//! underlying mapping only grows.
//!
//! Population is best-effort: a failing store read yields an empty map (and
//! a warning) instead of an error, so callers fall back to raw internal ids.
//! Failed loads are not cached.
//!
//! Concurrent misses for the same tenant may each load the map; the last
//! insert wins, which is harmless since loads are idempotent.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::store::RelationalStore;

/// Internal id -> external id for one tenant
pub type IdentityMap = HashMap<String, String>;

/// Cache hit / miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityCacheStats {
    /// Lookups served from memory
    pub hits: u64,
    /// Lookups that went to the store
    pub misses: u64,
    /// Store reads that failed and degraded to an empty map
    pub degraded: u64,
}

/// Bounded per-tenant identity cache
pub struct IdentityCache {
    store: Arc<dyn RelationalStore>,
    entries: Mutex<LruCache<String, Arc<IdentityMap>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
}

impl IdentityCache {
    /// Create a cache keeping at most `capacity` tenants resident
    pub fn new(store: Arc<dyn RelationalStore>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
        }
    }

    /// Identity map of `tenant`, loading it on a miss.
    ///
    /// Never fails: a store error degrades to an empty map.
    pub fn map_for(&self, tenant: &str) -> Arc<IdentityMap> {
        if let Some(map) = self.entries.lock().get(tenant) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(map);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // The lock is not held across the store read.
        match self.store.identity_pairs(tenant) {
            Ok(pairs) => {
                let map: Arc<IdentityMap> = Arc::new(pairs.into_iter().collect());
                debug!(tenant, entries = map.len(), "Loaded identity map");
                self.entries.lock().put(tenant.to_string(), Arc::clone(&map));
                map
            }
            Err(e) => {
                self.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(tenant, error = %e, "Identity map unavailable, using raw ids");
                Arc::new(IdentityMap::new())
            }
        }
    }

    /// External id for `internal_id`, if known
    pub fn lookup(&self, tenant: &str, internal_id: &str) -> Option<String> {
        self.map_for(tenant).get(internal_id).cloned()
    }

    /// Tenants currently resident
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// No tenant resident
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Counter snapshot
    pub fn stats(&self) -> IdentityCacheStats {
        IdentityCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, IntegrationUser};
    use std::thread;

    fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for tenant in ["t1", "t2", "t3"] {
            store.add_user(tenant, IntegrationUser::new("u1", format!("{}-alice", tenant), "github"));
        }
        store
    }

    #[test]
    fn test_loads_once_per_tenant() {
        let store = store();
        let cache = IdentityCache::new(store.clone(), 10);

        assert_eq!(cache.lookup("t1", "u1").as_deref(), Some("t1-alice"));
        assert_eq!(cache.lookup("t1", "u1").as_deref(), Some("t1-alice"));
        assert_eq!(store.identity_reads(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction_by_tenant() {
        let store = store();
        let cache = IdentityCache::new(store.clone(), 2);

        cache.map_for("t1");
        cache.map_for("t2");
        cache.map_for("t3");
        assert_eq!(cache.len(), 2);

        // t1 was evicted and reloads
        cache.map_for("t1");
        assert_eq!(store.identity_reads(), 4);
    }

    #[test]
    fn test_store_failure_degrades_to_empty() {
        let store = store();
        store.set_unavailable(true);
        let cache = IdentityCache::new(store.clone(), 10);

        assert!(cache.map_for("t1").is_empty());
        assert_eq!(cache.stats().degraded, 1);
        assert!(cache.is_empty());

        store.set_unavailable(false);
        assert_eq!(cache.lookup("t1", "u1").as_deref(), Some("t1-alice"));
    }

    #[test]
    fn test_concurrent_misses() {
        let store = store();
        let cache = Arc::new(IdentityCache::new(store.clone(), 10));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.lookup("t2", "u1"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("t2-alice"));
        }
        assert_eq!(cache.len(), 1);
    }
}
