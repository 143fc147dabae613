use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::{CatalogError, Result};
use super::persist::{read_map, write_json_atomic};
use super::types::{BlacklistEntry, ConsistencyIssue, PluginEntry, Tier, UpsertOutcome};
use crate::platform::RepoSlug;

/// Registry file name (`id -> tier`).
pub const ALLDEX_FILE: &str = "alldex.json";
/// Failure-tracking file name.
pub const BLACKLIST_FILE: &str = "blacklist.json";

fn same_repo(a: &RepoSlug, b: &RepoSlug) -> bool {
    a.owner().eq_ignore_ascii_case(b.owner()) && a.name().eq_ignore_ascii_case(b.name())
}

/// The persistent catalog: registry, tier files and blacklist.
///
/// A store is loaded once per invocation, mutated in memory and written
/// back with [`save`](Self::save). Every operation leaves the registry and
/// the tier files in agreement.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dir: PathBuf,
    registry: BTreeMap<String, Tier>,
    candidate: BTreeMap<String, PluginEntry>,
    primary: BTreeMap<String, PluginEntry>,
    blacklist: BTreeMap<String, BlacklistEntry>,
    blacklist_dirty: bool,
}

impl CatalogStore {
    /// Load the catalog from `dir`. Missing files start empty.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let registry = read_map::<Tier>(&dir.join(ALLDEX_FILE))?;
        let candidate = Self::load_tier(&dir, Tier::Candidate)?;
        let primary = Self::load_tier(&dir, Tier::Primary)?;
        let blacklist = read_map::<BlacklistEntry>(&dir.join(BLACKLIST_FILE))?;

        tracing::debug!(
            dir = %dir.display(),
            registered = registry.len(),
            candidate = candidate.len(),
            primary = primary.len(),
            tracked_failures = blacklist.len(),
            "Loaded catalog"
        );

        Ok(Self {
            dir,
            registry,
            candidate,
            primary,
            blacklist,
            blacklist_dirty: false,
        })
    }

    fn load_tier(dir: &Path, tier: Tier) -> Result<BTreeMap<String, PluginEntry>> {
        let mut entries = read_map::<PluginEntry>(&dir.join(tier.file_name()))?;
        // The key and the file are authoritative for id and tier.
        for (key, entry) in entries.iter_mut() {
            entry.id.clone_from(key);
            entry.tier = tier;
        }
        Ok(entries)
    }

    /// Directory the catalog was loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the tier files and the registry, then the blacklist if it
    /// changed. Each file is replaced atomically.
    pub fn save(&mut self) -> Result<()> {
        let mut written: Vec<PathBuf> = Vec::new();

        let path = self.dir.join(Tier::Candidate.file_name());
        write_step(&path, &self.candidate, &mut written)?;
        let path = self.dir.join(Tier::Primary.file_name());
        write_step(&path, &self.primary, &mut written)?;
        let path = self.dir.join(ALLDEX_FILE);
        write_step(&path, &self.registry, &mut written)?;

        if self.blacklist_dirty {
            let path = self.dir.join(BLACKLIST_FILE);
            write_step(&path, &self.blacklist, &mut written)?;
            self.blacklist_dirty = false;
        }

        tracing::debug!(dir = %self.dir.display(), "Catalog saved");
        Ok(())
    }

    fn tier_map(&self, tier: Tier) -> &BTreeMap<String, PluginEntry> {
        match tier {
            Tier::Candidate => &self.candidate,
            Tier::Primary => &self.primary,
        }
    }

    fn tier_map_mut(&mut self, tier: Tier) -> &mut BTreeMap<String, PluginEntry> {
        match tier {
            Tier::Candidate => &mut self.candidate,
            Tier::Primary => &mut self.primary,
        }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&PluginEntry> {
        let tier = self.registry.get(id)?;
        self.tier_map(*tier).get(id)
    }

    /// Registered tier of an id.
    pub fn tier_of(&self, id: &str) -> Option<Tier> {
        self.registry.get(id).copied()
    }

    /// All entries, candidate tier first, each tier in id order.
    pub fn entries(&self) -> impl Iterator<Item = &PluginEntry> {
        self.candidate.values().chain(self.primary.values())
    }

    pub fn tier_entries(&self, tier: Tier) -> impl Iterator<Item = &PluginEntry> {
        self.tier_map(tier).values()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Find the entry cataloging `repo` (owner and name compared
    /// case-insensitively).
    pub fn find_by_repository(&self, repo: &RepoSlug) -> Option<&PluginEntry> {
        self.entries().find(|e| same_repo(&e.repository, repo))
    }

    /// Insert a new entry or refresh an existing one.
    ///
    /// For an existing id the creation time and tier are kept, the version
    /// is prepended only when newer than the current head, and
    /// `lastModified` moves to `now`. Callers upsert only after a passing
    /// verification, so the timestamp doubles as the last successful check
    /// that staleness is measured from. The outcome says whether any content
    /// changed.
    pub fn upsert(&mut self, entry: PluginEntry, now: DateTime<Utc>) -> Result<UpsertOutcome> {
        if entry.id.trim().is_empty() {
            return Err(CatalogError::invariant(format!(
                "entry for {} has an empty id",
                entry.repository
            )));
        }

        let Some(tier) = self.tier_of(&entry.id) else {
            if let Some(other) = self.find_by_repository(&entry.repository) {
                return Err(CatalogError::invariant(format!(
                    "{} is already cataloged as '{}', refusing to add '{}'",
                    entry.repository, other.id, entry.id
                )));
            }

            let mut entry = entry;
            entry.created_at = now;
            entry.last_modified = now;
            tracing::info!(
                id = %entry.id,
                repo = %entry.repository,
                tier = %entry.tier,
                "Cataloged new plugin"
            );
            self.registry.insert(entry.id.clone(), entry.tier);
            self.tier_map_mut(entry.tier).insert(entry.id.clone(), entry);
            return Ok(UpsertOutcome::Created);
        };

        let existing = self.tier_map_mut(tier).get_mut(&entry.id).ok_or_else(|| {
            CatalogError::invariant(format!(
                "'{}' is registered as {} but missing from {}",
                entry.id,
                tier,
                tier.file_name()
            ))
        })?;

        if !same_repo(&existing.repository, &entry.repository) {
            return Err(CatalogError::invariant(format!(
                "id '{}' belongs to {}, not {}",
                entry.id, existing.repository, entry.repository
            )));
        }

        let mut changed = false;

        if let Some(incoming) = entry.versions.into_iter().next()
            && !existing.versions.iter().any(|v| v.tag == incoming.tag)
        {
            let is_head = match existing.versions.first() {
                Some(head) => incoming.is_newer_than(head),
                None => true,
            };
            if is_head {
                tracing::info!(id = %entry.id, tag = %incoming.tag, "New version");
                existing.versions.insert(0, incoming);
                changed = true;
            } else {
                tracing::debug!(
                    id = %entry.id,
                    tag = %incoming.tag,
                    "Ignoring version older than head"
                );
            }
        }

        changed |= refresh(&mut existing.name, entry.name);
        changed |= refresh(&mut existing.description, entry.description);
        changed |= refresh(&mut existing.category, entry.category);
        changed |= refresh(&mut existing.serialized_name, entry.serialized_name);

        existing.last_modified = now;
        if changed {
            Ok(UpsertOutcome::Updated)
        } else {
            Ok(UpsertOutcome::Unchanged)
        }
    }

    /// Move a candidate entry to the primary tier.
    pub fn promote(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        match self.tier_of(id) {
            None => Err(CatalogError::invariant(format!("'{id}' is not cataloged"))),
            Some(Tier::Primary) => Err(CatalogError::invariant(format!(
                "'{id}' is already primary"
            ))),
            Some(Tier::Candidate) => {
                let mut entry = self.candidate.remove(id).ok_or_else(|| {
                    CatalogError::invariant(format!("'{id}' is registered but has no entry"))
                })?;
                entry.tier = Tier::Primary;
                entry.last_modified = now;
                self.primary.insert(id.to_string(), entry);
                self.registry.insert(id.to_string(), Tier::Primary);
                tracing::info!(id, "Promoted to primary");
                Ok(())
            }
        }
    }

    /// Remove an entry from its tier file and the registry.
    pub fn prune(&mut self, id: &str) -> Result<PluginEntry> {
        let tier = self
            .registry
            .remove(id)
            .ok_or_else(|| CatalogError::invariant(format!("'{id}' is not cataloged")))?;
        let removed = self.tier_map_mut(tier).remove(id);
        // A stray copy in the other tier file goes too.
        self.tier_map_mut(other_tier(tier)).remove(id);

        let entry = removed.ok_or_else(|| {
            CatalogError::invariant(format!("'{id}' was registered without an entry"))
        })?;
        tracing::info!(id, repo = %entry.repository, "Pruned");
        Ok(entry)
    }

    /// Every disagreement between the registry and the tier files.
    pub fn check_consistency(&self) -> Vec<ConsistencyIssue> {
        let mut issues = Vec::new();
        for tier in Tier::ALL {
            for id in self.tier_map(tier).keys() {
                match self.registry.get(id) {
                    None => issues.push(ConsistencyIssue::Unregistered {
                        id: id.clone(),
                        tier,
                    }),
                    Some(&registered) if registered != tier => {
                        issues.push(ConsistencyIssue::WrongTier {
                            id: id.clone(),
                            registered,
                            found: tier,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        for (id, &registered) in &self.registry {
            if !self.tier_map(registered).contains_key(id) {
                issues.push(ConsistencyIssue::Dangling {
                    id: id.clone(),
                    registered,
                });
            }
        }
        issues
    }

    /// Drop whatever the registry and tier files disagree on.
    ///
    /// Returns the ids that are no longer cataloged afterwards.
    pub fn reconcile(&mut self) -> Vec<String> {
        let issues = self.check_consistency();
        let mut touched = BTreeSet::new();

        for issue in &issues {
            tracing::warn!("Catalog inconsistency: {}", issue);
            match issue {
                ConsistencyIssue::Unregistered { id, tier } => {
                    self.tier_map_mut(*tier).remove(id);
                }
                ConsistencyIssue::WrongTier { id, found, .. } => {
                    self.tier_map_mut(*found).remove(id);
                }
                ConsistencyIssue::Dangling { id, .. } => {
                    self.registry.remove(id);
                }
            }
            touched.insert(issue.id().to_string());
        }

        touched
            .into_iter()
            .filter(|id| self.get(id).is_none())
            .collect()
    }

    fn blacklist_key(&self, repo: &RepoSlug) -> Option<String> {
        let exact = repo.to_string();
        if self.blacklist.contains_key(&exact) {
            return Some(exact);
        }
        self.blacklist
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&exact))
            .cloned()
    }

    /// The failure-tracking table, keyed by `owner/name`.
    pub fn blacklist(&self) -> &BTreeMap<String, BlacklistEntry> {
        &self.blacklist
    }

    pub fn blacklist_entry(&self, repo: &RepoSlug) -> Option<&BlacklistEntry> {
        self.blacklist_key(repo).and_then(|k| self.blacklist.get(&k))
    }

    /// Number of recorded verification failures for `repo`.
    pub fn failure_count(&self, repo: &RepoSlug) -> u32 {
        self.blacklist_entry(repo).map_or(0, |e| e.failures)
    }

    pub fn is_blacklisted(&self, repo: &RepoSlug, threshold: u32) -> bool {
        self.blacklist_entry(repo)
            .is_some_and(|e| e.is_blacklisted(threshold))
    }

    /// Count one more failure for `repo` and return the new total.
    pub fn record_failure(
        &mut self,
        repo: &RepoSlug,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u32 {
        let key = self.blacklist_key(repo).unwrap_or_else(|| repo.to_string());
        let reason = reason.into();
        let entry = self
            .blacklist
            .entry(key)
            .and_modify(|e| {
                e.failures = e.failures.saturating_add(1);
                e.last_failure = now;
                e.reason.clone_from(&reason);
            })
            .or_insert_with(|| BlacklistEntry {
                failures: 1,
                last_failure: now,
                reason: reason.clone(),
            });
        let failures = entry.failures;
        self.blacklist_dirty = true;
        tracing::debug!(repo = %repo, failures, "Recorded verification failure");
        failures
    }

    /// Forget failures for `repo` while it is still under `threshold`.
    ///
    /// Returns whether a record was removed. Blacklisted repositories keep
    /// their count; only [`remove_from_blacklist`](Self::remove_from_blacklist)
    /// lifts them.
    pub fn clear_failures(&mut self, repo: &RepoSlug, threshold: u32) -> bool {
        let Some(key) = self.blacklist_key(repo) else {
            return false;
        };
        let below = self
            .blacklist
            .get(&key)
            .is_some_and(|e| !e.is_blacklisted(threshold));
        if below {
            self.blacklist.remove(&key);
            self.blacklist_dirty = true;
        }
        below
    }

    /// Drop every failure record for `repo`.
    pub fn remove_from_blacklist(&mut self, repo: &RepoSlug) -> Option<BlacklistEntry> {
        let key = self.blacklist_key(repo)?;
        let removed = self.blacklist.remove(&key);
        if removed.is_some() {
            self.blacklist_dirty = true;
        }
        removed
    }
}

fn other_tier(tier: Tier) -> Tier {
    match tier {
        Tier::Candidate => Tier::Primary,
        Tier::Primary => Tier::Candidate,
    }
}

fn refresh<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Write one file, turning a failure after earlier successes into
/// `PartialPersist`.
fn write_step<T: Serialize>(path: &Path, value: &T, written: &mut Vec<PathBuf>) -> Result<()> {
    match write_json_atomic(path, value) {
        Ok(()) => {
            written.push(path.to_path_buf());
            Ok(())
        }
        Err(err) if written.is_empty() => Err(err),
        Err(err) => Err(CatalogError::PartialPersist {
            path: path.to_path_buf(),
            written: written.clone(),
            message: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::catalog::types::VersionRecord;

    fn version(tag: &str) -> VersionRecord {
        VersionRecord {
            tag: tag.to_string(),
            assets: vec![format!("https://example.com/{tag}/plugin.eagleplugin")],
            released_at: None,
        }
    }

    fn entry(id: &str, repo: &str, tier: Tier, tag: &str) -> PluginEntry {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        PluginEntry {
            id: id.to_string(),
            repository: repo.parse().unwrap(),
            tier,
            name: format!("{id} name"),
            description: "desc".to_string(),
            category: None,
            serialized_name: id.to_lowercase(),
            versions: vec![version(tag)],
            created_at: epoch,
            last_modified: epoch,
        }
    }

    fn store() -> (tempfile::TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::load(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_load_empty_directory() {
        let (_dir, store) = store();
        assert!(store.is_empty());
        assert!(store.blacklist().is_empty());
    }

    #[test]
    fn test_upsert_creates_with_timestamps() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        let outcome = store
            .upsert(entry("MyPlugin", "o/r", Tier::Candidate, "v1.0.0"), now)
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created);
        let stored = store.get("MyPlugin").unwrap();
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.last_modified, now);
        assert_eq!(store.tier_of("MyPlugin"), Some(Tier::Candidate));
        assert!(store.get("myplugin").is_none());
    }

    #[test]
    fn test_upsert_prepends_newer_version() {
        let (_dir, mut store) = store();
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(1);
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), t0).unwrap();

        let outcome = store
            .upsert(entry("p", "o/r", Tier::Candidate, "v1.1.0"), t1)
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        let stored = store.get("p").unwrap();
        let tags: Vec<_> = stored.versions.iter().map(|v| v.tag.as_str()).collect();
        assert_eq!(tags, ["v1.1.0", "v1.0.0"]);
        assert_eq!(stored.created_at, t0);
        assert_eq!(stored.last_modified, t1);
    }

    #[test]
    fn test_upsert_ignores_known_and_older_versions() {
        let (_dir, mut store) = store();
        let t0 = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v2.0.0"), t0).unwrap();

        let later = t0 + Duration::days(1);
        assert_eq!(
            store.upsert(entry("p", "o/r", Tier::Candidate, "v2.0.0"), later).unwrap(),
            UpsertOutcome::Unchanged
        );
        assert_eq!(
            store.upsert(entry("p", "o/r", Tier::Candidate, "v1.9.0"), later).unwrap(),
            UpsertOutcome::Unchanged
        );
        let stored = store.get("p").unwrap();
        assert_eq!(stored.versions.len(), 1);
        assert_eq!(stored.created_at, t0);
        // A passing re-check restarts the staleness clock.
        assert_eq!(stored.last_modified, later);
    }

    #[test]
    fn test_upsert_refreshes_metadata() {
        let (_dir, mut store) = store();
        let t0 = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), t0).unwrap();

        let mut renamed = entry("p", "o/r", Tier::Candidate, "v1.0.0");
        renamed.description = "new description".to_string();
        let t1 = t0 + Duration::minutes(5);
        assert_eq!(store.upsert(renamed, t1).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.get("p").unwrap().description, "new description");
        assert_eq!(store.get("p").unwrap().last_modified, t1);
    }

    #[test]
    fn test_upsert_rejects_id_owned_by_other_repo() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), now).unwrap();

        let err = store
            .upsert(entry("p", "someone/else", Tier::Candidate, "v9.0.0"), now)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvariantViolation(_)));
        assert_eq!(store.get("p").unwrap().versions[0].tag, "v1.0.0");
    }

    #[test]
    fn test_upsert_rejects_second_id_for_same_repo() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), now).unwrap();
        let err = store
            .upsert(entry("q", "O/R", Tier::Candidate, "v1.0.0"), now)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvariantViolation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_never_changes_tier() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Primary, "v1.0.0"), now).unwrap();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.1.0"), now).unwrap();
        assert_eq!(store.tier_of("p"), Some(Tier::Primary));
        assert!(store.check_consistency().is_empty());
    }

    #[test]
    fn test_promote() {
        let (_dir, mut store) = store();
        let t0 = Utc::now();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), t0).unwrap();

        let t1 = t0 + Duration::seconds(30);
        store.promote("p", t1).unwrap();
        assert_eq!(store.tier_of("p"), Some(Tier::Primary));
        assert_eq!(store.get("p").unwrap().tier, Tier::Primary);
        assert_eq!(store.get("p").unwrap().last_modified, t1);
        assert_eq!(store.tier_entries(Tier::Candidate).count(), 0);

        assert!(matches!(
            store.promote("p", t1),
            Err(CatalogError::InvariantViolation(_))
        ));
        assert!(matches!(
            store.promote("missing", t1),
            Err(CatalogError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_prune() {
        let (_dir, mut store) = store();
        store
            .upsert(entry("p", "o/r", Tier::Primary, "v1.0.0"), Utc::now())
            .unwrap();
        let removed = store.prune("p").unwrap();
        assert_eq!(removed.id, "p");
        assert!(store.get("p").is_none());
        assert!(store.is_empty());
        assert!(store.prune("p").is_err());
    }

    #[test]
    fn test_reconcile_drops_inconsistent_records() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        store.upsert(entry("ok", "o/ok", Tier::Candidate, "v1.0.0"), now).unwrap();
        store
            .candidate
            .insert("orphan".to_string(), entry("orphan", "o/orphan", Tier::Candidate, "v1.0.0"));
        store.registry.insert("ghost".to_string(), Tier::Primary);
        store
            .primary
            .insert("misfiled".to_string(), entry("misfiled", "o/m", Tier::Primary, "v1.0.0"));
        store.registry.insert("misfiled".to_string(), Tier::Candidate);

        assert_eq!(store.check_consistency().len(), 4);

        let dropped = store.reconcile();
        assert_eq!(dropped, vec!["ghost", "misfiled", "orphan"]);
        assert!(store.check_consistency().is_empty());
        assert!(store.get("ok").is_some());
    }

    #[test]
    fn test_blacklist_counting() {
        let (_dir, mut store) = store();
        let repo: RepoSlug = "o/r".parse().unwrap();
        let now = Utc::now();

        assert_eq!(store.record_failure(&repo, "No releases", now), 1);
        assert!(!store.is_blacklisted(&repo, 2));

        let upper: RepoSlug = "O/R".parse().unwrap();
        assert_eq!(store.record_failure(&upper, "No workflows", now), 2);
        assert!(store.is_blacklisted(&repo, 2));
        assert_eq!(store.blacklist().len(), 1);
        assert_eq!(store.blacklist_entry(&repo).unwrap().reason, "No workflows");

        // Blacklisted counts survive a passing verification.
        assert!(!store.clear_failures(&repo, 2));
        assert_eq!(store.failure_count(&repo), 2);

        assert!(store.remove_from_blacklist(&repo).is_some());
        assert_eq!(store.failure_count(&repo), 0);
    }

    #[test]
    fn test_clear_failures_below_threshold() {
        let (_dir, mut store) = store();
        let repo: RepoSlug = "o/r".parse().unwrap();
        store.record_failure(&repo, "flaky", Utc::now());
        assert!(store.clear_failures(&repo, 2));
        assert_eq!(store.failure_count(&repo), 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let (dir, mut store) = store();
        let now = Utc::now();
        store.upsert(entry("Alpha", "o/a", Tier::Candidate, "v1.0.0"), now).unwrap();
        store.upsert(entry("Alpha", "o/a", Tier::Candidate, "v1.2.0"), now).unwrap();
        store.upsert(entry("beta", "o/b", Tier::Primary, "v0.1.0"), now).unwrap();
        store.record_failure(&"x/y".parse().unwrap(), "gone", now);
        store.save().unwrap();

        let loaded = CatalogStore::load(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("Alpha"), store.get("Alpha"));
        assert_eq!(loaded.get("beta"), store.get("beta"));
        assert_eq!(loaded.blacklist(), store.blacklist());
        let tags: Vec<_> = loaded
            .get("Alpha")
            .unwrap()
            .versions
            .iter()
            .map(|v| v.tag.clone())
            .collect();
        assert_eq!(tags, ["v1.2.0", "v1.0.0"]);

        let alldex = std::fs::read_to_string(dir.path().join(ALLDEX_FILE)).unwrap();
        assert_eq!(
            alldex,
            "{\n  \"Alpha\": \"candidate\",\n  \"beta\": \"primary\"\n}\n"
        );
    }

    #[test]
    fn test_save_skips_clean_blacklist() {
        let (dir, mut store) = store();
        store.save().unwrap();
        assert!(dir.path().join(ALLDEX_FILE).exists());
        assert!(!dir.path().join(BLACKLIST_FILE).exists());
    }

    #[test]
    fn test_load_malformed_tier_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("primary.json"), "[1, 2, 3]").unwrap();
        let err = CatalogStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_reports_partial_persist() {
        let (dir, mut store) = store();
        store.upsert(entry("p", "o/r", Tier::Candidate, "v1.0.0"), Utc::now()).unwrap();
        // A directory squatting on the primary file name makes its rename fail.
        std::fs::create_dir(dir.path().join("primary.json")).unwrap();
        std::fs::write(dir.path().join("primary.json").join("keep"), "x").unwrap();

        match store.save().unwrap_err() {
            CatalogError::PartialPersist { path, written, .. } => {
                assert!(path.ends_with("primary.json"));
                assert_eq!(written.len(), 1);
                assert!(written[0].ends_with("candidate.json"));
            }
            other => panic!("expected PartialPersist, got {other:?}"),
        }
    }
}
