//! Sync configuration, per-entry outcomes and run reports.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, Tier};
use crate::platform::{RepoSlug, rate_limits};

/// Entries younger than this are not re-verified.
pub const DEFAULT_STALENESS_DAYS: i64 = 3;

/// Upper bound on entries verified in one run.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 200;

/// Failures after which a repository is blacklisted.
pub const DEFAULT_BLACKLIST_THRESHOLD: u32 = 2;

/// Remote calls kept in reserve when sizing a batch from the quota.
pub const DEFAULT_QUOTA_RESERVE: usize = 50;

/// Knobs for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum age since the last change before an entry is re-verified.
    pub staleness: Duration,
    /// Maximum entries verified per run.
    pub max_batch_size: usize,
    /// Failure count that blacklists a repository.
    pub blacklist_threshold: u32,
    /// Quota left untouched when sizing the batch.
    pub quota_reserve: usize,
    /// Pacing applied by the CLI when it wraps the client.
    pub min_call_interval: std::time::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::days(DEFAULT_STALENESS_DAYS),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            blacklist_threshold: DEFAULT_BLACKLIST_THRESHOLD,
            quota_reserve: DEFAULT_QUOTA_RESERVE,
            min_call_interval: rate_limits::MIN_CALL_INTERVAL,
        }
    }
}

/// What happened to one entry during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    /// A new version or metadata change was stored.
    Updated,
    /// Verified, nothing new.
    Unchanged,
    /// Removed from the catalog.
    Pruned,
    /// Verification failed below the blacklist threshold.
    Failed,
    /// Changed too recently to need re-verification.
    SkippedFresh,
    /// Withheld because the repository is blacklisted.
    SkippedBlacklisted,
    /// Left for a later run (batch cap, quota or abort).
    Deferred,
}

impl EntryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Pruned => "pruned",
            Self::Failed => "failed",
            Self::SkippedFresh => "skipped (fresh)",
            Self::SkippedBlacklisted => "skipped (blacklisted)",
            Self::Deferred => "deferred",
        }
    }

    /// Whether the outcome mutated the catalog.
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Updated | Self::Pruned)
    }
}

impl fmt::Display for EntryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a sync report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub id: String,
    pub repository: Option<RepoSlug>,
    pub outcome: EntryOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl EntryReport {
    pub fn new(id: impl Into<String>, repository: Option<RepoSlug>, outcome: EntryOutcome) -> Self {
        Self {
            id: id.into(),
            repository,
            outcome,
            reasons: Vec::new(),
        }
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }
}

/// Outcome counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub pruned: usize,
    pub failed: usize,
    pub skipped_fresh: usize,
    pub skipped_blacklisted: usize,
    pub deferred: usize,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.updated
            + self.unchanged
            + self.pruned
            + self.failed
            + self.skipped_fresh
            + self.skipped_blacklisted
            + self.deferred
    }
}

/// Result of a full sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<EntryReport>,
    /// Why processing stopped early, if it did.
    pub aborted: Option<String>,
    /// Why the catalog could not be written, if it could not.
    pub persist_error: Option<String>,
}

impl SyncReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            outcomes: Vec::new(),
            aborted: None,
            persist_error: None,
        }
    }

    pub fn summary(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for report in &self.outcomes {
            let slot = match report.outcome {
                EntryOutcome::Updated => &mut summary.updated,
                EntryOutcome::Unchanged => &mut summary.unchanged,
                EntryOutcome::Pruned => &mut summary.pruned,
                EntryOutcome::Failed => &mut summary.failed,
                EntryOutcome::SkippedFresh => &mut summary.skipped_fresh,
                EntryOutcome::SkippedBlacklisted => &mut summary.skipped_blacklisted,
                EntryOutcome::Deferred => &mut summary.deferred,
            };
            *slot += 1;
        }
        summary
    }

    /// Counts keyed by outcome, for table output.
    pub fn counts(&self) -> BTreeMap<EntryOutcome, usize> {
        let mut counts = BTreeMap::new();
        for report in &self.outcomes {
            *counts.entry(report.outcome).or_insert(0) += 1;
        }
        counts
    }

    /// Number of entries the run changed.
    pub fn mutations(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| r.outcome.is_mutation())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.persist_error.is_none()
    }
}

/// What a manual submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    Updated,
    Unchanged,
    Promoted,
    SkippedFresh,
    Failed,
}

impl fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Promoted => "promoted",
            Self::SkippedFresh => "skipped (fresh)",
            Self::Failed => "failed",
        })
    }
}

/// Result of a manual submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReport {
    pub repository: RepoSlug,
    pub outcome: CreateOutcome,
    pub id: Option<String>,
    pub tier: Option<Tier>,
    pub name: Option<String>,
    pub serialized_name: Option<String>,
    pub latest_version: Option<String>,
    pub localized: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Failure count after this submission, when one was recorded.
    pub failures: Option<u32>,
}

impl CreateReport {
    pub(crate) fn new(repository: RepoSlug, outcome: CreateOutcome) -> Self {
        Self {
            repository,
            outcome,
            id: None,
            tier: None,
            name: None,
            serialized_name: None,
            latest_version: None,
            localized: false,
            created_at: None,
            last_modified: None,
            reasons: Vec::new(),
            failures: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, CreateOutcome::Failed)
    }
}

/// Errors from the orchestration entry points.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Rate limit exhausted. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("{repository} is blacklisted after {failures} failed verifications")]
    Blacklisted { repository: RepoSlug, failures: u32 },
}
