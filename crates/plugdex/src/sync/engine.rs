//! The catalog sync engine.
//!
//! A run goes through four phases:
//!
//! 1. **Selecting**: reconcile the registry, withhold blacklisted and fresh
//!    entries, order the rest oldest-first and cap the batch.
//! 2. **Processing**: verify each batched entry in turn and turn the verdict
//!    into a plan. Failures are counted here.
//! 3. **Applying**: carry out exactly one upsert or prune per plan.
//! 4. **Persisting**: write the catalog, even after an aborted run.
//!
//! Pacing is the client's job; wrap it in a
//! [`RateLimitedClient`](crate::platform::RateLimitedClient).
//!
//! # Example
//!
//! ```ignore
//! use plugdex::catalog::CatalogStore;
//! use plugdex::sync::{SyncConfig, SyncEngine};
//! use plugdex::verify::{Verifier, VerifyRules};
//!
//! let mut store = CatalogStore::load("index")?;
//! let engine = SyncEngine::new(Verifier::new(client, VerifyRules::default()), SyncConfig::default());
//! let report = engine.sync_all(&mut store, None).await;
//! println!("{:?}", report.summary());
//! ```

mod create;
mod select;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

pub use select::{Candidate, Selection, quota_cap, select};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{EntryOutcome, EntryReport, SyncConfig, SyncReport};
use crate::catalog::{CatalogStore, UpsertOutcome};
use crate::platform::{RemoteRepositoryClient, RepoSlug, short_error_message};
use crate::verify::{ExtractedMetadata, Verifier, VerifyError};

/// What processing decided for one entry.
enum Plan {
    Update {
        candidate: Candidate,
        metadata: ExtractedMetadata,
    },
    Prune {
        candidate: Candidate,
        reasons: Vec<String>,
    },
    Report(EntryReport),
}

/// Drives verification against the catalog.
pub struct SyncEngine<C> {
    verifier: Verifier<C>,
    config: SyncConfig,
    on_progress: Option<ProgressCallback>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<C: RemoteRepositoryClient> SyncEngine<C> {
    pub fn new(verifier: Verifier<C>, config: SyncConfig) -> Self {
        Self {
            verifier,
            config,
            on_progress: None,
            shutdown: None,
        }
    }

    /// Report progress through `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Stop between entries once `flag` is set.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn verifier(&self) -> &Verifier<C> {
        &self.verifier
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Ask the client how many entries the remaining quota covers.
    async fn quota_cap(&self) -> Option<usize> {
        match self.verifier.client().rate_limit().await {
            Ok(info) => {
                let cap = quota_cap(info.remaining, self.config.quota_reserve);
                tracing::debug!(remaining = info.remaining, cap, "Quota checked");
                emit(
                    self.progress(),
                    SyncProgress::QuotaChecked {
                        remaining: info.remaining,
                        cap,
                    },
                );
                Some(cap)
            }
            Err(e) => {
                tracing::warn!("Could not read remote quota: {}", short_error_message(&e));
                emit(
                    self.progress(),
                    SyncProgress::Warning {
                        message: format!("Could not read remote quota: {e}"),
                    },
                );
                None
            }
        }
    }

    /// Run one full sync over `store`, or over the entry for `only`.
    ///
    /// The store is saved before returning no matter how processing ended.
    pub async fn sync_all(&self, store: &mut CatalogStore, only: Option<&RepoSlug>) -> SyncReport {
        let now = Utc::now();
        let mut report = SyncReport::new(now);

        // Selecting
        let dropped = store.reconcile();
        if !dropped.is_empty() {
            emit(
                self.progress(),
                SyncProgress::Reconciled {
                    dropped: dropped.clone(),
                },
            );
            report.outcomes.extend(dropped.into_iter().map(|id| {
                EntryReport::new(id, None, EntryOutcome::Pruned)
                    .with_reasons(vec!["registry and tier files disagreed".to_string()])
            }));
        }

        if let Some(repo) = only
            && store.find_by_repository(repo).is_none()
        {
            let message = format!("{repo} is not cataloged");
            tracing::warn!("{}", message);
            emit(self.progress(), SyncProgress::Warning { message });
        }

        let cap = self.quota_cap().await;
        let selection = select(store, &self.config, only, now, cap);
        emit(
            self.progress(),
            SyncProgress::Selected {
                batch: selection.batch.len(),
                fresh: selection.count(EntryOutcome::SkippedFresh),
                blacklisted: selection.count(EntryOutcome::SkippedBlacklisted),
                deferred: selection.deferred.len(),
            },
        );
        tracing::info!(
            batch = selection.batch.len(),
            skipped = selection.skipped.len(),
            deferred = selection.deferred.len(),
            "Selected entries"
        );

        let Selection {
            batch,
            skipped,
            deferred,
        } = selection;
        for skip in &skipped {
            self.entry_done(skip);
        }
        report.outcomes.extend(skipped);
        report.outcomes.extend(deferred);

        // Processing
        let plans = self.process(store, batch, now, &mut report).await;

        // Applying
        for plan in plans {
            let outcome = self.apply(store, plan, now);
            self.entry_done(&outcome);
            report.outcomes.push(outcome);
        }

        // Persisting
        emit(self.progress(), SyncProgress::Persisting);
        match store.save() {
            Ok(()) => emit(self.progress(), SyncProgress::Persisted),
            Err(e) => {
                tracing::error!("Failed to persist catalog: {}", e);
                emit(
                    self.progress(),
                    SyncProgress::PersistError {
                        error: e.to_string(),
                    },
                );
                report.persist_error = Some(e.to_string());
            }
        }

        report.finished_at = Utc::now();
        let summary = report.summary();
        tracing::info!(
            updated = summary.updated,
            unchanged = summary.unchanged,
            pruned = summary.pruned,
            failed = summary.failed,
            skipped_fresh = summary.skipped_fresh,
            skipped_blacklisted = summary.skipped_blacklisted,
            deferred = summary.deferred,
            aborted = report.aborted.is_some(),
            "Sync finished"
        );
        report
    }

    async fn process(
        &self,
        store: &mut CatalogStore,
        batch: Vec<Candidate>,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Vec<Plan> {
        let total = batch.len();
        let mut plans = Vec::with_capacity(total);
        let mut queue = batch.into_iter().enumerate();

        while let Some((index, candidate)) = queue.next() {
            if self.shutdown_requested() {
                let deferred = self.defer_rest(candidate, &mut queue, report);
                tracing::warn!(deferred, "Shutdown requested, stopping");
                emit(self.progress(), SyncProgress::Interrupted { deferred });
                report.aborted = Some("shutdown requested".to_string());
                break;
            }

            emit(
                self.progress(),
                SyncProgress::Verifying {
                    id: candidate.id.clone(),
                    repository: candidate.repository.to_string(),
                    index,
                    total,
                },
            );

            let result = match self.verifier.verify(&candidate.repository).await {
                Ok(result) => result,
                Err(VerifyError::RateLimited { reset_at, .. }) => {
                    let deferred = self.defer_rest(candidate, &mut queue, report);
                    tracing::warn!(%reset_at, deferred, "Rate limit exhausted, stopping");
                    emit(
                        self.progress(),
                        SyncProgress::RateLimited { reset_at, deferred },
                    );
                    report.aborted = Some(format!("rate limit exhausted, resets at {reset_at}"));
                    break;
                }
            };

            let threshold = self.config.blacklist_threshold;
            if result.passed {
                store.clear_failures(&candidate.repository, threshold);
                match result.metadata {
                    Some(metadata) => plans.push(Plan::Update {
                        candidate,
                        metadata,
                    }),
                    None => plans.push(Plan::Report(
                        candidate
                            .report(EntryOutcome::Failed)
                            .with_reasons(vec!["verification produced no metadata".to_string()]),
                    )),
                }
                continue;
            }

            let reasons: Vec<String> = result.reasons.iter().map(ToString::to_string).collect();
            let failures =
                store.record_failure(&candidate.repository, result.reason_summary(), now);
            tracing::info!(
                id = %candidate.id,
                repo = %candidate.repository,
                failures,
                "Verification failed: {}",
                result.reason_summary()
            );

            if result.repository_missing || failures >= threshold {
                plans.push(Plan::Prune { candidate, reasons });
            } else {
                plans.push(Plan::Report(
                    candidate.report(EntryOutcome::Failed).with_reasons(reasons),
                ));
            }
        }

        plans
    }

    /// Mark `current` and everything left in `rest` as deferred.
    fn defer_rest(
        &self,
        current: Candidate,
        rest: &mut impl Iterator<Item = (usize, Candidate)>,
        report: &mut SyncReport,
    ) -> usize {
        let before = report.outcomes.len();
        report
            .outcomes
            .push(current.report(EntryOutcome::Deferred));
        report
            .outcomes
            .extend(rest.map(|(_, c)| c.report(EntryOutcome::Deferred)));
        report.outcomes.len() - before
    }

    fn apply(&self, store: &mut CatalogStore, plan: Plan, now: DateTime<Utc>) -> EntryReport {
        match plan {
            Plan::Report(report) => report,
            Plan::Update {
                candidate,
                metadata,
            } => {
                let tier = store.tier_of(&candidate.id).unwrap_or_default();
                let mut entry = metadata.into_entry(candidate.repository.clone(), tier, now);
                // The id a plugin was cataloged under never changes.
                entry.id.clone_from(&candidate.id);

                match store.upsert(entry, now) {
                    Ok(UpsertOutcome::Unchanged) => candidate.report(EntryOutcome::Unchanged),
                    Ok(UpsertOutcome::Updated | UpsertOutcome::Created) => {
                        candidate.report(EntryOutcome::Updated)
                    }
                    Err(e) => candidate
                        .report(EntryOutcome::Failed)
                        .with_reasons(vec![e.to_string()]),
                }
            }
            Plan::Prune { candidate, reasons } => match store.prune(&candidate.id) {
                Ok(_) => candidate.report(EntryOutcome::Pruned).with_reasons(reasons),
                Err(e) => candidate
                    .report(EntryOutcome::Failed)
                    .with_reasons(vec![e.to_string()]),
            },
        }
    }

    fn entry_done(&self, report: &EntryReport) {
        emit(
            self.progress(),
            SyncProgress::EntryDone {
                id: report.id.clone(),
                outcome: report.outcome,
                reasons: report.reasons.clone(),
            },
        );
    }
}
