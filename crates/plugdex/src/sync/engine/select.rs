//! Batch selection for a sync run.

use chrono::{DateTime, Utc};

use super::super::types::{EntryOutcome, EntryReport, SyncConfig};
use crate::catalog::CatalogStore;
use crate::platform::{RepoSlug, rate_limits};

/// An entry chosen for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub repository: RepoSlug,
    pub last_modified: DateTime<Utc>,
}

impl Candidate {
    pub(crate) fn report(&self, outcome: EntryOutcome) -> EntryReport {
        EntryReport::new(self.id.clone(), Some(self.repository.clone()), outcome)
    }
}

/// The partition of the catalog for one run.
#[derive(Debug, Default)]
pub struct Selection {
    /// Oldest first.
    pub batch: Vec<Candidate>,
    pub skipped: Vec<EntryReport>,
    pub deferred: Vec<EntryReport>,
}

impl Selection {
    pub fn count(&self, outcome: EntryOutcome) -> usize {
        self.skipped.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Entries the remaining quota can cover after holding back `reserve`.
pub fn quota_cap(remaining: usize, reserve: usize) -> usize {
    remaining.saturating_sub(reserve) / rate_limits::CALLS_PER_ENTRY
}

fn matches(repo: &RepoSlug, only: Option<&RepoSlug>) -> bool {
    only.is_none_or(|o| {
        o.owner().eq_ignore_ascii_case(repo.owner()) && o.name().eq_ignore_ascii_case(repo.name())
    })
}

/// Partition the catalog into skipped, batched and deferred entries.
///
/// Blacklisted repositories are withheld before anything else; fresh
/// entries next. The rest is ordered oldest-first and cut at the smaller
/// of `max_batch_size` and `cap`.
pub fn select(
    store: &CatalogStore,
    config: &SyncConfig,
    only: Option<&RepoSlug>,
    now: DateTime<Utc>,
    cap: Option<usize>,
) -> Selection {
    let mut selection = Selection::default();
    let mut eligible = Vec::new();

    for entry in store.entries().filter(|e| matches(&e.repository, only)) {
        let candidate = Candidate {
            id: entry.id.clone(),
            repository: entry.repository.clone(),
            last_modified: entry.last_modified,
        };

        if store.is_blacklisted(&entry.repository, config.blacklist_threshold) {
            tracing::debug!(id = %entry.id, repo = %entry.repository, "Skipping blacklisted");
            let failures = store.failure_count(&entry.repository);
            selection.skipped.push(
                candidate
                    .report(EntryOutcome::SkippedBlacklisted)
                    .with_reasons(vec![format!("{failures} recorded failures")]),
            );
        } else if entry.age(now) < config.staleness {
            selection
                .skipped
                .push(candidate.report(EntryOutcome::SkippedFresh));
        } else {
            eligible.push(candidate);
        }
    }

    eligible.sort_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.id.cmp(&b.id))
    });

    let limit = cap.map_or(config.max_batch_size, |c| c.min(config.max_batch_size));
    if eligible.len() > limit {
        let overflow = eligible.split_off(limit);
        tracing::info!(
            deferred = overflow.len(),
            limit,
            "Batch capped, deferring the newest entries"
        );
        selection.deferred = overflow
            .iter()
            .map(|c| c.report(EntryOutcome::Deferred))
            .collect();
    }
    selection.batch = eligible;
    selection
}
