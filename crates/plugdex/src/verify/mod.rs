//! Repository eligibility checks.
//!
//! [`Verifier::verify`] runs the catalog's admission rules against one
//! repository, cheapest first, and returns a [`VerificationResult`]
//! listing every failed check. Verification never touches local state.
//!
//! ```ignore
//! use plugdex::verify::{Verifier, VerifyRules};
//!
//! let verifier = Verifier::new(client, VerifyRules::default());
//! let result = verifier.verify(&"eagle-cooler/eagle-webdav".parse()?).await?;
//! if !result.passed {
//!     for reason in &result.reasons {
//!         eprintln!("{reason}");
//!     }
//! }
//! ```

mod checks;
mod manifest;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use checks::{check_tag, latest_applicable};
pub use manifest::{MIN_HOST_VERSION_KEYS, Manifest, ManifestIssue, parse_manifest};

use crate::catalog::{PluginEntry, Tier, VersionRecord, serialized_name};
use crate::localization::{DEFAULT_LOCALE_PATH, LocalizationResolver};
use crate::platform::{Release, RemoteError, RemoteRepositoryClient, RepoSlug, short_error_message};

/// Tunable admission rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRules {
    /// File extension of plugin packages.
    pub package_extension: String,
    /// Login that must have uploaded every release asset.
    pub automation_identity: String,
    /// Manifest location on the default branch.
    pub manifest_path: String,
    /// Default-locale bundle used to resolve `{{key}}` placeholders.
    pub locale_path: String,
}

impl Default for VerifyRules {
    fn default() -> Self {
        Self {
            package_extension: ".eagleplugin".to_string(),
            automation_identity: "github-actions[bot]".to_string(),
            manifest_path: "manifest.json".to_string(),
            locale_path: DEFAULT_LOCALE_PATH.to_string(),
        }
    }
}

/// Which admission rule a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Repository,
    Workflows,
    Release,
    PackageAsset,
    Manifest,
    TagFormat,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Repository => "repository",
            Self::Workflows => "workflows",
            Self::Release => "release",
            Self::PackageAsset => "package asset",
            Self::Manifest => "manifest",
            Self::TagFormat => "tag format",
        })
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub check: CheckKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(check: CheckKind, message: impl Into<String>) -> Self {
        Self {
            check,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.message)
    }
}

/// Catalog data read out of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub serialized_name: String,
    /// Whether any field came out of the locale bundle.
    pub localized: bool,
    pub version: VersionRecord,
}

impl ExtractedMetadata {
    /// Build a catalog entry. Timestamps are placeholders; the store sets
    /// them on insertion.
    pub fn into_entry(self, repository: RepoSlug, tier: Tier, now: DateTime<Utc>) -> PluginEntry {
        PluginEntry {
            id: self.id,
            repository,
            tier,
            name: self.name,
            description: self.description,
            category: self.category,
            serialized_name: self.serialized_name,
            versions: vec![self.version],
            created_at: now,
            last_modified: now,
        }
    }
}

/// Verdict for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub repository: RepoSlug,
    pub passed: bool,
    pub reasons: Vec<FailureReason>,
    /// Set when the repository itself is gone.
    pub repository_missing: bool,
    pub metadata: Option<ExtractedMetadata>,
}

impl VerificationResult {
    /// Reasons joined into one line.
    pub fn reason_summary(&self) -> String {
        self.reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Errors that abort a verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Rate limit exhausted while verifying {repository}. Resets at {reset_at}")]
    RateLimited {
        repository: RepoSlug,
        reset_at: DateTime<Utc>,
    },
}

/// Runs the admission rules through a remote client.
pub struct Verifier<C> {
    client: C,
    rules: VerifyRules,
}

impl<C: RemoteRepositoryClient> Verifier<C> {
    pub fn new(client: C, rules: VerifyRules) -> Self {
        Self { client, rules }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn rules(&self) -> &VerifyRules {
        &self.rules
    }

    /// Turn a remote error inside a check into a failed check, letting a
    /// rate limit through as fatal.
    fn check_failure(
        repo: &RepoSlug,
        check: CheckKind,
        context: &str,
        err: RemoteError,
    ) -> Result<FailureReason, VerifyError> {
        match err {
            RemoteError::RateLimited { reset_at } => Err(VerifyError::RateLimited {
                repository: repo.clone(),
                reset_at,
            }),
            other => Ok(FailureReason::new(
                check,
                format!("{context}: {}", short_error_message(&other)),
            )),
        }
    }

    /// Verify one repository.
    pub async fn verify(&self, repo: &RepoSlug) -> Result<VerificationResult, VerifyError> {
        tracing::debug!(repo = %repo, "Verifying");

        match self.client.exists(repo).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(VerificationResult {
                    repository: repo.clone(),
                    passed: false,
                    reasons: vec![FailureReason::new(
                        CheckKind::Repository,
                        "Repository not found or not accessible",
                    )],
                    repository_missing: true,
                    metadata: None,
                });
            }
            Err(e) => {
                // Unreachable is not the same as gone; the entry is kept.
                let reason = Self::check_failure(
                    repo,
                    CheckKind::Repository,
                    "Could not reach repository",
                    e,
                )?;
                return Ok(VerificationResult {
                    repository: repo.clone(),
                    passed: false,
                    reasons: vec![reason],
                    repository_missing: false,
                    metadata: None,
                });
            }
        }

        let mut reasons = Vec::new();

        match self.client.list_workflows(repo).await {
            Ok(workflows) if workflows.is_empty() => reasons.push(FailureReason::new(
                CheckKind::Workflows,
                "No automation workflows found",
            )),
            Ok(_) => {}
            Err(e) => reasons.push(Self::check_failure(
                repo,
                CheckKind::Workflows,
                "Could not list workflows",
                e,
            )?),
        }

        let release = match self.client.list_releases(repo).await {
            Ok(releases) => {
                let latest = latest_applicable(&releases).cloned();
                if latest.is_none() {
                    reasons.push(FailureReason::new(
                        CheckKind::Release,
                        "No published release found",
                    ));
                }
                latest
            }
            Err(e) => {
                reasons.push(Self::check_failure(
                    repo,
                    CheckKind::Release,
                    "Could not list releases",
                    e,
                )?);
                None
            }
        };

        if let Some(release) = &release {
            if let Some(msg) = checks::check_provenance(release, &self.rules.automation_identity) {
                reasons.push(FailureReason::new(CheckKind::Release, msg));
            }
            if let Some(msg) = checks::check_package_asset(release, &self.rules.package_extension)
            {
                reasons.push(FailureReason::new(CheckKind::PackageAsset, msg));
            }
        }

        let manifest = match self.client.get_file(repo, &self.rules.manifest_path).await {
            Ok(bytes) => match parse_manifest(&bytes) {
                Ok(manifest) => Some(manifest),
                Err(issues) => {
                    reasons.extend(
                        issues
                            .into_iter()
                            .map(|issue| FailureReason::new(CheckKind::Manifest, issue.to_string())),
                    );
                    None
                }
            },
            Err(e) if e.is_not_found() => {
                reasons.push(FailureReason::new(
                    CheckKind::Manifest,
                    format!("{} not found on the default branch", self.rules.manifest_path),
                ));
                None
            }
            Err(e) => {
                reasons.push(Self::check_failure(
                    repo,
                    CheckKind::Manifest,
                    "Could not fetch manifest",
                    e,
                )?);
                None
            }
        };

        if let Some(release) = &release
            && let Some(msg) = check_tag(&release.tag)
        {
            reasons.push(FailureReason::new(CheckKind::TagFormat, msg));
        }

        let metadata = match (manifest, release) {
            (Some(manifest), Some(release)) => {
                let metadata = self.extract(repo, manifest, &release).await;
                if metadata.is_none() {
                    reasons.push(FailureReason::new(
                        CheckKind::Manifest,
                        "Cannot derive a plugin id: manifest id and name are both empty",
                    ));
                }
                metadata
            }
            _ => None,
        };

        let passed = reasons.is_empty();
        if passed {
            tracing::debug!(repo = %repo, "Verification passed");
        } else {
            tracing::debug!(repo = %repo, failures = reasons.len(), "Verification failed");
        }

        Ok(VerificationResult {
            repository: repo.clone(),
            passed,
            reasons,
            repository_missing: false,
            metadata,
        })
    }

    async fn extract(
        &self,
        repo: &RepoSlug,
        manifest: Manifest,
        release: &Release,
    ) -> Option<ExtractedMetadata> {
        let resolver = LocalizationResolver::new(&self.client, self.rules.locale_path.as_str());

        let name = resolver.resolve(repo, &manifest.name).await;
        let description = match &manifest.description {
            Some(text) => Some(resolver.resolve(repo, text).await),
            None => None,
        };
        let category = match &manifest.category {
            Some(text) => Some(resolver.resolve(repo, text).await),
            None => None,
        };

        let localized = name.was_resolved
            || description.as_ref().is_some_and(|r| r.was_resolved)
            || category.as_ref().is_some_and(|r| r.was_resolved);

        let id = manifest
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| name.text.trim())
            .to_string();
        if id.is_empty() {
            return None;
        }

        Some(ExtractedMetadata {
            id,
            serialized_name: serialized_name(&name.text),
            name: name.text,
            description: description.map(|r| r.text).unwrap_or_default(),
            category: category.map(|r| r.text),
            localized,
            version: VersionRecord {
                tag: release.tag.clone(),
                assets: checks::package_asset_urls(release, &self.rules.package_extension),
                released_at: release.published_at,
            },
        })
    }
}
