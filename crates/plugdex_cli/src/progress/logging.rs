use plugdex::sync::{EntryOutcome, SyncProgress};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::Reconciled { dropped } => {
                tracing::warn!(count = dropped.len(), dropped = ?dropped, "Dropped inconsistent entries");
            }

            SyncProgress::QuotaChecked { remaining, cap } => {
                tracing::info!(remaining, cap, "Remote quota");
            }

            SyncProgress::Selected {
                batch,
                fresh,
                blacklisted,
                deferred,
            } => {
                tracing::info!(batch, fresh, blacklisted, deferred, "Selected entries");
            }

            SyncProgress::Verifying {
                id,
                repository,
                index,
                total,
            } => {
                tracing::debug!(id = %id, repo = %repository, position = index + 1, total, "Verifying");
            }

            SyncProgress::EntryDone {
                id,
                outcome,
                reasons,
            } => match outcome {
                EntryOutcome::Failed | EntryOutcome::Pruned => {
                    tracing::warn!(id = %id, outcome = %outcome, reasons = %reasons.join("; "), "Entry done");
                }
                EntryOutcome::Updated => tracing::info!(id = %id, "Updated"),
                _ => tracing::debug!(id = %id, outcome = %outcome, "Entry done"),
            },

            SyncProgress::RateLimited { reset_at, deferred } => {
                tracing::warn!(reset_at = %reset_at, deferred, "Rate limit exhausted");
            }

            SyncProgress::Interrupted { deferred } => {
                tracing::warn!(deferred, "Interrupted");
            }

            SyncProgress::Persisting => tracing::debug!("Writing catalog"),

            SyncProgress::Persisted => tracing::info!("Catalog written"),

            SyncProgress::PersistError { error } => {
                tracing::error!(error = %error, "Failed to write catalog");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
