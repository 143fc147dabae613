use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::{RepoSlugError, Result};

/// A repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    /// Build a slug from its parts, validating both are non-empty and slash-free.
    pub fn new(owner: &str, name: &str) -> std::result::Result<Self, RepoSlugError> {
        format!("{owner}/{name}").parse()
    }

    /// Repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoSlug {
    type Err = RepoSlugError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(RepoSlugError::Format(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl Serialize for RepoSlug {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RepoSlug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rate limit information from a platform.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

/// A downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name of the asset.
    pub name: String,
    /// Login of the account that uploaded the asset.
    pub uploader: Option<String>,
    /// Public download URL.
    pub url: String,
}

/// A release as seen by the verifier (platform-agnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release tag name.
    pub tag: String,
    /// Whether the release is an unpublished draft.
    pub draft: bool,
    /// Whether the release is marked as a prerelease.
    pub prerelease: bool,
    /// Publication time, if published.
    pub published_at: Option<DateTime<Utc>>,
    /// Attached assets.
    pub assets: Vec<ReleaseAsset>,
}

/// Remote accessor consumed by the verifier and the localization resolver.
///
/// Every call counts against the platform's rate budget. Implementations
/// convert their platform-specific errors into [`RemoteError`](super::RemoteError).
#[async_trait]
pub trait RemoteRepositoryClient: Send + Sync {
    /// Check whether the repository exists and is reachable.
    async fn exists(&self, repo: &RepoSlug) -> Result<bool>;

    /// Fetch a file from the default branch, already decoded to raw bytes.
    ///
    /// Returns `RemoteError::NotFound` when the file is absent.
    async fn get_file(&self, repo: &RepoSlug, path: &str) -> Result<Vec<u8>>;

    /// List the paths of the repository's automation workflow definitions.
    async fn list_workflows(&self, repo: &RepoSlug) -> Result<Vec<String>>;

    /// List releases, newest first.
    async fn list_releases(&self, repo: &RepoSlug) -> Result<Vec<Release>>;

    /// Get current rate limit status.
    async fn rate_limit(&self) -> Result<RateLimitInfo>;
}

#[async_trait]
impl<C: RemoteRepositoryClient + ?Sized> RemoteRepositoryClient for std::sync::Arc<C> {
    async fn exists(&self, repo: &RepoSlug) -> Result<bool> {
        (**self).exists(repo).await
    }

    async fn get_file(&self, repo: &RepoSlug, path: &str) -> Result<Vec<u8>> {
        (**self).get_file(repo, path).await
    }

    async fn list_workflows(&self, repo: &RepoSlug) -> Result<Vec<String>> {
        (**self).list_workflows(repo).await
    }

    async fn list_releases(&self, repo: &RepoSlug) -> Result<Vec<Release>> {
        (**self).list_releases(repo).await
    }

    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        (**self).rate_limit().await
    }
}
