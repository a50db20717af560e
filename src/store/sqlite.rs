//! SQLite-backed relational store

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use super::{IntegrationUser, RelationalStore};
use crate::error::StoreError;
use crate::ou::OuConfig;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS integration_users (
    tenant           TEXT NOT NULL,
    id               TEXT NOT NULL,
    cloud_id         TEXT NOT NULL,
    integration_type TEXT NOT NULL,
    PRIMARY KEY (tenant, id)
);
CREATE TABLE IF NOT EXISTS ou_members (
    tenant    TEXT NOT NULL,
    ou_ref_id TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    PRIMARY KEY (tenant, ou_ref_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_ou_members_user ON ou_members (tenant, user_id);
"#;

/// Relational store on a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace an integration user
    pub fn upsert_user(&self, tenant: &str, user: &IntegrationUser) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO integration_users (tenant, id, cloud_id, integration_type) VALUES (?1, ?2, ?3, ?4)",
            params![tenant, user.id, user.cloud_id, user.integration_type],
        )?;
        Ok(())
    }

    /// Add `user_id` to the OU `ou_ref_id`
    pub fn add_ou_member(&self, tenant: &str, ou_ref_id: &str, user_id: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO ou_members (tenant, ou_ref_id, user_id) VALUES (?1, ?2, ?3)",
            params![tenant, ou_ref_id, user_id],
        )?;
        Ok(())
    }
}

/// `?n, ?n+1, ...` for `count` parameters starting at `first`
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Membership select wrapped as `SELECT id FROM (...) a`
fn ou_members_sql(ou_count: usize, type_count: usize) -> String {
    format!(
        r#"
        SELECT id FROM (
            SELECT DISTINCT u.id AS id
            FROM ou_members m
            JOIN integration_users u ON u.tenant = m.tenant AND u.id = m.user_id
            WHERE m.tenant = ?1
              AND m.ou_ref_id IN ({})
              AND u.integration_type IN ({})
        ) a
        ORDER BY id ASC
        "#,
        placeholders(2, ou_count),
        placeholders(2 + ou_count, type_count),
    )
}

impl RelationalStore for SqliteStore {
    fn identity_pairs(&self, tenant: &str) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, cloud_id FROM integration_users WHERE tenant = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![tenant], |row| Ok((row.get(0)?, row.get(1)?)))?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn ou_member_ids(
        &self,
        tenant: &str,
        ou: &OuConfig,
        integration_types: &[&str],
    ) -> Result<Vec<String>, StoreError> {
        if ou.ou_ref_ids.is_empty() || integration_types.is_empty() {
            return Ok(Vec::new());
        }

        let sql = ou_members_sql(ou.ou_ref_ids.len(), integration_types.len());
        debug!(tenant, ou = ?ou.ou_ref_ids, "Resolving OU members");

        let values: Vec<&str> = std::iter::once(tenant)
            .chain(ou.ou_ref_ids.iter().map(String::as_str))
            .chain(integration_types.iter().copied())
            .collect();

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
        let sql = ou_members_sql(1, 2);
        assert!(sql.contains("IN (?2)"));
        assert!(sql.contains("IN (?3, ?4)"));
        assert!(sql.trim_start().starts_with("SELECT id FROM ("));
    }

    #[test]
    fn test_identity_pairs_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_user("acme", &IntegrationUser::new("u1", "alice", "github"))
            .unwrap();
        store
            .upsert_user("acme", &IntegrationUser::new("u1", "alice-renamed", "github"))
            .unwrap();

        let pairs = store.identity_pairs("acme").unwrap();
        assert_eq!(pairs, vec![("u1".to_string(), "alice-renamed".to_string())]);
    }
}
