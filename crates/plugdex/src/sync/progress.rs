//! Progress reporting types for sync operations.
//!
//! The engine reports through an optional callback so the CLI can render
//! progress bars on a terminal and log lines everywhere else.

use chrono::{DateTime, Utc};

use super::types::EntryOutcome;

/// Progress events emitted during a sync run or a manual submission.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Registry and tier files disagreed; the listed ids were dropped.
    Reconciled {
        /// Ids no longer cataloged after reconciliation.
        dropped: Vec<String>,
    },

    /// Remote quota was checked before sizing the batch.
    QuotaChecked {
        /// Calls remaining in the current window.
        remaining: usize,
        /// Entries the remaining quota can cover.
        cap: usize,
    },

    /// Selection finished.
    Selected {
        /// Entries that will be verified.
        batch: usize,
        /// Entries skipped as fresh.
        fresh: usize,
        /// Entries skipped as blacklisted.
        blacklisted: usize,
        /// Entries left for a later run.
        deferred: usize,
    },

    /// Starting to verify one entry.
    Verifying {
        /// Plugin id.
        id: String,
        /// Repository being verified.
        repository: String,
        /// Position in the batch (0-indexed).
        index: usize,
        /// Batch size.
        total: usize,
    },

    /// An entry reached its final outcome.
    EntryDone {
        /// Plugin id.
        id: String,
        /// Final outcome.
        outcome: EntryOutcome,
        /// Failure reasons, if any.
        reasons: Vec<String>,
    },

    /// Processing stopped because the remote quota ran out.
    RateLimited {
        /// When the quota resets.
        reset_at: DateTime<Utc>,
        /// Entries pushed to a later run.
        deferred: usize,
    },

    /// Processing stopped on a shutdown request.
    Interrupted {
        /// Entries pushed to a later run.
        deferred: usize,
    },

    /// Writing the catalog.
    Persisting,

    /// Catalog written.
    Persisted,

    /// Catalog could not be written.
    PersistError {
        /// Error message.
        error: String,
    },

    /// Warning message (non-fatal).
    Warning {
        /// Warning message.
        message: String,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// This is a convenience function to avoid repetitive `if let Some(cb) = ...` patterns.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
