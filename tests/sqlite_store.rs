//! SQLite-backed identity and OU resolution through the facet services

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{context_with, terms_response, ScriptedBackend};
use scm_facets::config::EngineConfig;
use scm_facets::filter::{CommitDimension, CommitFilter, FilterModel};
use scm_facets::store::{IntegrationUser, RelationalStore, SqliteStore};
use scm_facets::{CommitFacets, OuConfig, OuRole, PageWindow};

fn seeded(dir: &TempDir) -> SqliteStore {
    let store = SqliteStore::open(dir.path().join("facets.sqlite")).unwrap();
    for (id, cloud_id, kind) in [("u1", "alice@gh", "github"), ("u2", "bob@gl", "gitlab"), ("u3", "carol", "jira")] {
        store.upsert_user("acme", &IntegrationUser::new(id, cloud_id, kind)).unwrap();
        store.add_ou_member("acme", "ou-eng", id).unwrap();
    }
    store.upsert_user("other", &IntegrationUser::new("u9", "zed", "github")).unwrap();
    store
}

#[test]
fn test_ou_members_filtered_by_integration_type() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);

    let ou = OuConfig::new(["ou-eng"], [OuRole::Author]);
    let scm = store.ou_member_ids("acme", &ou, &["github", "gitlab"]).unwrap();
    assert_eq!(scm, vec!["u1".to_string(), "u2".to_string()]);

    let issues = store.ou_member_ids("acme", &ou, &["jira"]).unwrap();
    assert_eq!(issues, vec!["u3".to_string()]);

    let unknown = OuConfig::new(["ou-none"], [OuRole::Author]);
    assert!(store.ou_member_ids("acme", &unknown, &["github"]).unwrap().is_empty());
}

#[test]
fn test_identity_pairs_are_per_tenant() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);

    let pairs = store.identity_pairs("acme").unwrap();
    assert_eq!(pairs.len(), 3);
    assert!(pairs.contains(&("u1".to_string(), "alice@gh".to_string())));
    assert!(store.identity_pairs("nobody").unwrap().is_empty());
}

#[test]
fn test_upsert_replaces_cloud_id() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store
        .upsert_user("acme", &IntegrationUser::new("u1", "alice-renamed", "github"))
        .unwrap();

    let pairs = store.identity_pairs("acme").unwrap();
    assert!(pairs.contains(&("u1".to_string(), "alice-renamed".to_string())));
    assert_eq!(pairs.len(), 3);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    drop(seeded(&dir));

    let reopened = SqliteStore::open(dir.path().join("facets.sqlite")).unwrap();
    assert_eq!(reopened.identity_pairs("acme").unwrap().len(), 3);
}

#[test]
fn test_group_by_scoped_and_labelled_from_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(seeded(&dir));
    let backend = ScriptedBackend::new().answer(
        "across_committer",
        terms_response("across_committer", &[("u1", 6), ("u2", 2)]),
    );
    let commits = CommitFacets::new(context_with(&backend, store, EngineConfig::default()));

    let filter = CommitFilter::default().with_across(CommitDimension::Committer);
    let ou = OuConfig::new(["ou-eng"], [OuRole::Author, OuRole::Committer]);
    let result = commits
        .group_by("acme", &filter, false, Some(&ou), PageWindow::new(0, 10))
        .unwrap();

    let display: Vec<Option<&str>> = result.records.iter().map(|r| r.additional_key.as_deref()).collect();
    assert_eq!(display, vec![Some("alice@gh"), Some("bob@gl")]);

    let query = backend.requests()[0].body()["query"].to_string();
    assert!(query.contains("c_committer_id"));
    assert!(!query.contains("c_author_id"));
    assert!(!query.contains("\"u3\""));
}

#[test]
fn test_in_memory_database() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert_user("acme", &IntegrationUser::new("u1", "alice", "github")).unwrap();
    assert_eq!(store.identity_pairs("acme").unwrap().len(), 1);
}
