//! Manual submission of a single repository.

use chrono::Utc;

use super::SyncEngine;
use crate::catalog::{CatalogStore, Tier, UpsertOutcome};
use crate::platform::{RemoteRepositoryClient, RepoSlug};
use crate::sync::types::{CreateOutcome, CreateReport, SyncError};
use crate::verify::{VerificationResult, VerifyError};

impl<C: RemoteRepositoryClient> SyncEngine<C> {
    /// Verify `repo` and catalog it under `tier`.
    ///
    /// A blacklisted repository is refused even with `force`. A cataloged
    /// entry changed within the staleness window is left alone unless
    /// `force` is set. Primary entries are never demoted.
    pub async fn create_entry(
        &self,
        store: &mut CatalogStore,
        repo: &RepoSlug,
        tier: Tier,
        force: bool,
    ) -> Result<CreateReport, SyncError> {
        let now = Utc::now();
        let threshold = self.config.blacklist_threshold;

        if store.is_blacklisted(repo, threshold) {
            return Err(SyncError::Blacklisted {
                repository: repo.clone(),
                failures: store.failure_count(repo),
            });
        }

        let existing = store
            .find_by_repository(repo)
            .map(|e| (e.id.clone(), e.tier, e.age(now)));

        if let Some((id, current, age)) = &existing
            && !force
            && *age < self.config.staleness
        {
            tracing::info!(id = %id, repo = %repo, "Entry is fresh, skipping");
            let mut report = CreateReport::new(repo.clone(), CreateOutcome::SkippedFresh);
            report.id = Some(id.clone());
            report.tier = Some(*current);
            return Ok(report);
        }

        let result = match self.verifier.verify(repo).await {
            Ok(result) => result,
            Err(VerifyError::RateLimited { reset_at, .. }) => {
                return Err(SyncError::RateLimited { reset_at });
            }
        };

        if !result.passed {
            return self.reject(store, repo, existing.is_some(), result, now);
        }

        let Some(metadata) = result.metadata else {
            let mut report = CreateReport::new(repo.clone(), CreateOutcome::Failed);
            report.reasons = vec!["verification produced no metadata".to_string()];
            return Ok(report);
        };
        let localized = metadata.localized;

        let (entry_tier, reused_id) = match &existing {
            Some((id, current, _)) => (*current, Some(id.clone())),
            None => (tier, None),
        };
        let mut entry = metadata.into_entry(repo.clone(), entry_tier, now);
        if let Some(id) = reused_id {
            entry.id = id;
        }
        let id = entry.id.clone();

        let upserted = store.upsert(entry, now)?;
        store.clear_failures(repo, threshold);

        let mut outcome = match upserted {
            UpsertOutcome::Created => CreateOutcome::Created,
            UpsertOutcome::Updated => CreateOutcome::Updated,
            UpsertOutcome::Unchanged => CreateOutcome::Unchanged,
        };
        if tier == Tier::Primary && store.tier_of(&id) == Some(Tier::Candidate) {
            store.promote(&id, now)?;
            outcome = CreateOutcome::Promoted;
        }

        store.save()?;

        let mut report = CreateReport::new(repo.clone(), outcome);
        report.localized = localized;
        if let Some(entry) = store.get(&id) {
            report.tier = Some(entry.tier);
            report.name = Some(entry.name.clone());
            report.serialized_name = Some(entry.serialized_name.clone());
            report.latest_version = entry.latest_version().map(|v| v.tag.clone());
            report.created_at = Some(entry.created_at);
            report.last_modified = Some(entry.last_modified);
        }
        report.id = Some(id);
        tracing::info!(repo = %repo, outcome = %report.outcome, "Submission processed");
        Ok(report)
    }

    fn reject(
        &self,
        store: &mut CatalogStore,
        repo: &RepoSlug,
        cataloged: bool,
        result: VerificationResult,
        now: chrono::DateTime<Utc>,
    ) -> Result<CreateReport, SyncError> {
        let mut report = CreateReport::new(repo.clone(), CreateOutcome::Failed);
        report.reasons = result.reasons.iter().map(ToString::to_string).collect();

        if cataloged {
            let failures = store.record_failure(repo, result.reason_summary(), now);
            store.save()?;
            report.failures = Some(failures);
        }

        tracing::info!(repo = %repo, "Submission rejected: {}", result.reason_summary());
        Ok(report)
    }

    /// Verify `repo` without touching any catalog.
    pub async fn verify_one(&self, repo: &RepoSlug) -> Result<VerificationResult, SyncError> {
        self.verifier
            .verify(repo)
            .await
            .map_err(|VerifyError::RateLimited { reset_at, .. }| SyncError::RateLimited { reset_at })
    }
}
