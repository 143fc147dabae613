//! Integration tests for sync runs and manual submissions.
//!
//! Every test runs the engine against an in-memory remote and a temporary
//! index directory, then reloads the catalog from disk to check what was
//! actually persisted.
//!
//! Key scenarios tested:
//! - Stale entries are refreshed, fresh ones skipped, and a second run is a no-op
//! - Two failures across two runs blacklist and prune an entry for good
//! - A rate-limit abort or shutdown still persists finished work
//! - Manual submissions create, refresh, promote and refuse as documented

mod common;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use common::{FakeClient, FakeRepo, TEST_TIMEOUT, release, slug};
use plugdex::catalog::{CatalogStore, PluginEntry, Tier, VersionRecord, serialized_name};
use plugdex::sync::{
    CreateOutcome, EntryOutcome, SyncConfig, SyncEngine, SyncError, SyncProgress, SyncReport,
};
use plugdex::verify::{Verifier, VerifyRules};

type Engine = SyncEngine<Arc<FakeClient>>;

fn engine_with(client: &Arc<FakeClient>, config: SyncConfig) -> Engine {
    SyncEngine::new(
        Verifier::new(Arc::clone(client), VerifyRules::default()),
        config,
    )
}

fn engine(client: &Arc<FakeClient>) -> Engine {
    engine_with(client, SyncConfig::default())
}

fn repo_of(id: &str) -> String {
    format!("eagle-cooler/{id}")
}

/// An entry matching what [`FakeRepo::passing`] produces for `id` at v1.0.0.
fn entry(id: &str) -> PluginEntry {
    PluginEntry {
        id: id.to_string(),
        repository: slug(&repo_of(id)),
        tier: Tier::Candidate,
        name: id.to_string(),
        description: format!("{id} plugin"),
        category: None,
        serialized_name: serialized_name(id),
        versions: vec![VersionRecord {
            tag: "v1.0.0".to_string(),
            assets: vec![
                "https://example.invalid/download/v1.0.0/plugin.eagleplugin".to_string(),
            ],
            released_at: Some(common::published_at()),
        }],
        created_at: Utc::now(),
        last_modified: Utc::now(),
    }
}

/// Write a catalog whose entries were last changed `age_days` ago.
fn seed(dir: &Path, entries: &[(&str, i64)]) {
    let mut store = CatalogStore::load(dir).unwrap();
    let now = Utc::now();
    for (id, age_days) in entries {
        store
            .upsert(entry(id), now - Duration::days(*age_days))
            .unwrap();
    }
    store.save().unwrap();
}

/// A remote where every seeded id passes with a newer release.
fn remote_with_update(ids: &[&str]) -> Arc<FakeClient> {
    let client = FakeClient::new();
    for id in ids {
        client.set_repo(
            &repo_of(id),
            FakeRepo::passing(id, "v1.0.0").with_release(release("v1.1.0", common::BOT)),
        );
    }
    Arc::new(client)
}

async fn run(engine: &Engine, dir: &Path) -> SyncReport {
    let mut store = CatalogStore::load(dir).unwrap();
    tokio::time::timeout(TEST_TIMEOUT, engine.sync_all(&mut store, None))
        .await
        .expect("sync should not hang")
}

fn outcome_of(report: &SyncReport, id: &str) -> Option<EntryOutcome> {
    report
        .outcomes
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.outcome)
}

#[tokio::test]
async fn test_sync_refreshes_stale_and_skips_fresh() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("old", 10), ("fresh", 1)]);
    let client = remote_with_update(&["old", "fresh"]);

    let report = run(&engine(&client), dir.path()).await;

    assert!(report.is_success());
    assert_eq!(outcome_of(&report, "old"), Some(EntryOutcome::Updated));
    assert_eq!(outcome_of(&report, "fresh"), Some(EntryOutcome::SkippedFresh));

    let store = CatalogStore::load(dir.path()).unwrap();
    let old = store.get("old").unwrap();
    let tags: Vec<_> = old.versions.iter().map(|v| v.tag.as_str()).collect();
    assert_eq!(tags, ["v1.1.0", "v1.0.0"]);
    assert!(Utc::now() - old.last_modified < Duration::minutes(1));
    assert_eq!(store.get("fresh").unwrap().versions.len(), 1);
    assert!(store.check_consistency().is_empty());
}

#[tokio::test]
async fn test_second_run_makes_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 20)]);
    let client = remote_with_update(&["a", "b"]);
    let engine = engine(&client);

    let first = run(&engine, dir.path()).await;
    assert_eq!(first.mutations(), 2);
    let calls = client.calls();

    let second = run(&engine, dir.path()).await;
    assert_eq!(second.mutations(), 0);
    assert_eq!(second.summary().skipped_fresh, 2);
    assert_eq!(client.calls(), calls);
}

#[tokio::test]
async fn test_unchanged_entry_is_fresh_after_passing_check() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 20)]);
    let client = Arc::new(
        FakeClient::new()
            .with_repo(&repo_of("a"), FakeRepo::passing("a", "v1.0.0"))
            .with_repo(&repo_of("b"), FakeRepo::passing("b", "v1.0.0")),
    );
    let engine = engine(&client);

    let first = run(&engine, dir.path()).await;
    assert_eq!(first.summary().unchanged, 2);
    assert_eq!(first.mutations(), 0);
    let store = CatalogStore::load(dir.path()).unwrap();
    let a = store.get("a").unwrap();
    assert!(Utc::now() - a.last_modified < Duration::minutes(1));
    assert_eq!(a.versions.len(), 1);
    let calls = client.calls();

    let second = run(&engine, dir.path()).await;
    assert_eq!(second.summary().skipped_fresh, 2);
    assert_eq!(client.calls(), calls);
}

#[tokio::test]
async fn test_unchanged_entries_do_not_starve_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 5)]);
    let client = Arc::new(
        FakeClient::new()
            .with_repo(&repo_of("a"), FakeRepo::passing("a", "v1.0.0"))
            .with_repo(&repo_of("b"), FakeRepo::passing("b", "v1.0.0")),
    );
    let config = SyncConfig {
        max_batch_size: 1,
        ..SyncConfig::default()
    };
    let engine = engine_with(&client, config);

    let first = run(&engine, dir.path()).await;
    assert_eq!(outcome_of(&first, "a"), Some(EntryOutcome::Unchanged));
    assert_eq!(outcome_of(&first, "b"), Some(EntryOutcome::Deferred));

    let second = run(&engine, dir.path()).await;
    assert_eq!(outcome_of(&second, "a"), Some(EntryOutcome::SkippedFresh));
    assert_eq!(outcome_of(&second, "b"), Some(EntryOutcome::Unchanged));
}

#[tokio::test]
async fn test_batch_is_oldest_first_and_capped() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 30), ("c", 20)]);
    let client = remote_with_update(&["a", "b", "c"]);
    let config = SyncConfig {
        max_batch_size: 2,
        ..SyncConfig::default()
    };

    let report = run(&engine_with(&client, config), dir.path()).await;

    assert_eq!(outcome_of(&report, "b"), Some(EntryOutcome::Updated));
    assert_eq!(outcome_of(&report, "c"), Some(EntryOutcome::Updated));
    assert_eq!(outcome_of(&report, "a"), Some(EntryOutcome::Deferred));
}

#[tokio::test]
async fn test_remote_quota_limits_batch() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 20)]);
    let client = remote_with_update(&["a", "b"]);
    // Room for exactly one entry above the reserve.
    client.set_quota(plugdex::sync::DEFAULT_QUOTA_RESERVE + plugdex::rate_limits::CALLS_PER_ENTRY);

    let report = run(&engine(&client), dir.path()).await;

    assert_eq!(outcome_of(&report, "b"), Some(EntryOutcome::Updated));
    assert_eq!(outcome_of(&report, "a"), Some(EntryOutcome::Deferred));
    assert!(report.is_success());
}

#[tokio::test]
async fn test_two_failures_blacklist_and_prune() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("broken", 10), ("good", 10)]);
    let client = remote_with_update(&["good"]);
    client.set_repo(
        &repo_of("broken"),
        FakeRepo::passing("broken", "v1.0.0").without_workflows(),
    );
    let engine = engine(&client);
    let broken = slug(&repo_of("broken"));

    let first = run(&engine, dir.path()).await;
    assert_eq!(outcome_of(&first, "broken"), Some(EntryOutcome::Failed));
    let store = CatalogStore::load(dir.path()).unwrap();
    assert_eq!(store.failure_count(&broken), 1);
    assert!(store.get("broken").is_some());

    let second = run(&engine, dir.path()).await;
    assert_eq!(outcome_of(&second, "broken"), Some(EntryOutcome::Pruned));
    let store = CatalogStore::load(dir.path()).unwrap();
    assert_eq!(store.failure_count(&broken), 2);
    assert!(store.get("broken").is_none());
    assert!(store.get("good").is_some());
    assert!(store.check_consistency().is_empty());

    let calls = client.calls();
    let third = run(&engine, dir.path()).await;
    assert_eq!(outcome_of(&third, "broken"), None);
    assert_eq!(client.calls(), calls);

    let mut store = CatalogStore::load(dir.path()).unwrap();
    let err = engine
        .create_entry(&mut store, &broken, Tier::Candidate, true)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Blacklisted { failures: 2, .. }));
}

#[tokio::test]
async fn test_blacklisted_entry_is_never_verified() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("banned", 30)]);
    let mut store = CatalogStore::load(dir.path()).unwrap();
    let repo = slug(&repo_of("banned"));
    store.record_failure(&repo, "release: no assets", Utc::now());
    store.record_failure(&repo, "release: no assets", Utc::now());
    store.save().unwrap();

    let client = remote_with_update(&["banned"]);
    let report = run(&engine(&client), dir.path()).await;

    assert_eq!(
        outcome_of(&report, "banned"),
        Some(EntryOutcome::SkippedBlacklisted)
    );
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_missing_repository_is_pruned_at_once() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("gone", 10)]);
    let client = Arc::new(FakeClient::new());

    let report = run(&engine(&client), dir.path()).await;

    assert_eq!(outcome_of(&report, "gone"), Some(EntryOutcome::Pruned));
    let store = CatalogStore::load(dir.path()).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.failure_count(&slug(&repo_of("gone"))), 1);
}

#[tokio::test]
async fn test_pass_clears_earlier_failure() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("flaky", 10)]);
    let mut store = CatalogStore::load(dir.path()).unwrap();
    store.record_failure(&slug(&repo_of("flaky")), "workflows: timeout", Utc::now());
    store.save().unwrap();

    let client = remote_with_update(&["flaky"]);
    let report = run(&engine(&client), dir.path()).await;

    assert_eq!(outcome_of(&report, "flaky"), Some(EntryOutcome::Updated));
    let store = CatalogStore::load(dir.path()).unwrap();
    assert!(store.blacklist().is_empty());
}

#[tokio::test]
async fn test_rate_limit_aborts_but_persists_finished_work() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 30), ("b", 20), ("c", 10)]);
    let client = remote_with_update(&["a", "b", "c"]);
    // exists, workflows, releases and manifest for the first entry only.
    client.exhaust_after(4);

    let report = run(&engine(&client), dir.path()).await;

    assert!(report.aborted.is_some());
    assert!(report.persist_error.is_none());
    assert!(!report.is_success());
    assert_eq!(outcome_of(&report, "a"), Some(EntryOutcome::Updated));
    assert_eq!(outcome_of(&report, "b"), Some(EntryOutcome::Deferred));
    assert_eq!(outcome_of(&report, "c"), Some(EntryOutcome::Deferred));

    let store = CatalogStore::load(dir.path()).unwrap();
    assert_eq!(store.get("a").unwrap().versions[0].tag, "v1.1.0");
    assert_eq!(store.get("b").unwrap().versions[0].tag, "v1.0.0");
    // A rate limit is not the repository's fault.
    assert!(store.blacklist().is_empty());
}

#[tokio::test]
async fn test_shutdown_defers_remaining_entries() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 20)]);
    let client = remote_with_update(&["a", "b"]);
    let flag = Arc::new(AtomicBool::new(true));
    let engine = engine(&client).with_shutdown_flag(flag);

    let report = run(&engine, dir.path()).await;

    assert_eq!(report.summary().deferred, 2);
    assert_eq!(report.aborted.as_deref(), Some("shutdown requested"));
    assert_eq!(client.calls(), 0);
    assert!(dir.path().join("alldex.json").exists());
}

#[tokio::test]
async fn test_reconcile_drops_dangling_registry_entries() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("kept", 1)]);
    std::fs::write(
        dir.path().join("alldex.json"),
        r#"{"kept": "candidate", "ghost": "primary"}"#,
    )
    .unwrap();
    let client = Arc::new(FakeClient::new());

    let report = run(&engine(&client), dir.path()).await;

    assert_eq!(outcome_of(&report, "ghost"), Some(EntryOutcome::Pruned));
    let registry: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("alldex.json")).unwrap())
            .unwrap();
    assert_eq!(registry, serde_json::json!({"kept": "candidate"}));
}

#[tokio::test]
async fn test_single_repository_sync() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10), ("b", 10)]);
    let client = remote_with_update(&["a", "b"]);
    let engine = engine(&client);

    let mut store = CatalogStore::load(dir.path()).unwrap();
    let only = slug("Eagle-Cooler/B");
    let report = engine.sync_all(&mut store, Some(&only)).await;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(outcome_of(&report, "b"), Some(EntryOutcome::Updated));
}

#[tokio::test]
async fn test_progress_events_cover_the_run() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10)]);
    let client = remote_with_update(&["a"]);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let engine = engine(&client).with_progress(Box::new(move |event| {
        sink.lock().unwrap().push(event);
    }));

    run(&engine, dir.path()).await;

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, SyncProgress::Selected { batch: 1, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::EntryDone {
            outcome: EntryOutcome::Updated,
            ..
        }
    )));
    assert!(matches!(events.last(), Some(SyncProgress::Persisted)));
}

#[tokio::test]
async fn test_create_entry_new_repository() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(FakeClient::new().with_repo(
        "eagle-cooler/eagle-webdav",
        FakeRepo::passing("WebDAV", "v1.2.3"),
    ));
    let engine = engine(&client);
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let report = engine
        .create_entry(&mut store, &slug("eagle-cooler/eagle-webdav"), Tier::Candidate, false)
        .await
        .unwrap();

    assert_eq!(report.outcome, CreateOutcome::Created);
    assert_eq!(report.id.as_deref(), Some("WebDAV"));
    assert_eq!(report.tier, Some(Tier::Candidate));
    assert_eq!(report.latest_version.as_deref(), Some("v1.2.3"));
    assert_eq!(report.created_at, report.last_modified);

    let registry: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("alldex.json")).unwrap())
            .unwrap();
    assert_eq!(registry, serde_json::json!({"WebDAV": "candidate"}));
}

#[tokio::test]
async fn test_create_entry_fresh_requires_force() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 1)]);
    let client = remote_with_update(&["a"]);
    let engine = engine(&client);
    let repo = slug(&repo_of("a"));
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let skipped = engine
        .create_entry(&mut store, &repo, Tier::Candidate, false)
        .await
        .unwrap();
    assert_eq!(skipped.outcome, CreateOutcome::SkippedFresh);
    assert_eq!(client.calls(), 0);

    let forced = engine
        .create_entry(&mut store, &repo, Tier::Candidate, true)
        .await
        .unwrap();
    assert_eq!(forced.outcome, CreateOutcome::Updated);
    assert_eq!(forced.latest_version.as_deref(), Some("v1.1.0"));
}

#[tokio::test]
async fn test_create_entry_promotes_but_never_demotes() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10)]);
    let client = remote_with_update(&["a"]);
    let engine = engine(&client);
    let repo = slug(&repo_of("a"));
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let promoted = engine
        .create_entry(&mut store, &repo, Tier::Primary, false)
        .await
        .unwrap();
    assert_eq!(promoted.outcome, CreateOutcome::Promoted);
    assert_eq!(promoted.tier, Some(Tier::Primary));

    let again = engine
        .create_entry(&mut store, &repo, Tier::Candidate, true)
        .await
        .unwrap();
    assert_eq!(again.outcome, CreateOutcome::Unchanged);
    assert_eq!(again.tier, Some(Tier::Primary));

    let store = CatalogStore::load(dir.path()).unwrap();
    assert_eq!(store.tier_of("a"), Some(Tier::Primary));
    assert!(store.check_consistency().is_empty());
}

#[tokio::test]
async fn test_create_entry_keeps_id_when_manifest_changes() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("a", 10)]);
    let client = Arc::new(FakeClient::new());
    client.set_repo(&repo_of("a"), FakeRepo::passing("renamed", "v1.1.0"));
    let engine = engine(&client);
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let report = engine
        .create_entry(&mut store, &slug("EAGLE-COOLER/A"), Tier::Candidate, false)
        .await
        .unwrap();

    assert_eq!(report.id.as_deref(), Some("a"));
    assert_eq!(report.name.as_deref(), Some("renamed"));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_create_entry_failure_counts_only_cataloged() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[("listed", 10)]);
    let client = Arc::new(FakeClient::new());
    client.set_repo(
        &repo_of("listed"),
        FakeRepo::passing("listed", "v1.0.0").without_workflows(),
    );
    client.set_repo(
        "someone/new",
        FakeRepo::passing("new", "v1.0.0").without_workflows(),
    );
    let engine = engine(&client);
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let fresh = engine
        .create_entry(&mut store, &slug("someone/new"), Tier::Candidate, false)
        .await
        .unwrap();
    assert_eq!(fresh.outcome, CreateOutcome::Failed);
    assert!(!fresh.reasons.is_empty());
    assert_eq!(fresh.failures, None);

    let listed = engine
        .create_entry(&mut store, &slug(&repo_of("listed")), Tier::Candidate, false)
        .await
        .unwrap();
    assert_eq!(listed.failures, Some(1));

    let store = CatalogStore::load(dir.path()).unwrap();
    assert_eq!(store.blacklist().len(), 1);
    assert!(store.get("listed").is_some());
}

#[tokio::test]
async fn test_create_entry_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let client = remote_with_update(&["a"]);
    client.exhaust_after(0);
    let engine = engine(&client);
    let mut store = CatalogStore::load(dir.path()).unwrap();

    let err = engine
        .create_entry(&mut store, &slug(&repo_of("a")), Tier::Candidate, false)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RateLimited { .. }));
}
