//! GitHub API client creation and rate limit management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::convert::{decode_content, to_release, workflow_paths};
use super::error::{GitHubError, classify};
use super::types::{
    ContentFile, GitHubRateLimitResponse, GitHubRelease, ReleasesQuery, WorkflowList,
};
use crate::platform::{self, RateLimitInfo, Release, RemoteError, RemoteRepositoryClient, RepoSlug};

/// Create an Octocrab instance, authenticated when a token is given.
///
/// `api_url` overrides the API root (GitHub Enterprise or a local mock).
pub fn create_client(
    token: Option<&str>,
    api_url: Option<&str>,
) -> Result<Octocrab, GitHubError> {
    let mut builder = Octocrab::builder();
    if let Some(url) = api_url {
        builder = builder.base_uri(url).map_err(GitHubError::Api)?;
    }
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        builder = builder.personal_token(token.to_string());
    }
    builder.build().map_err(GitHubError::Api)
}

/// Get current rate limit status (core API only).
pub async fn get_rate_limit(client: &Octocrab) -> Result<RateLimitInfo, GitHubError> {
    let rate_limit = client.ratelimit().get().await?;
    let core = &rate_limit.resources.core;

    Ok(RateLimitInfo {
        limit: core.limit,
        remaining: core.remaining,
        reset_at: DateTime::from_timestamp(core.reset as i64, 0).unwrap_or_else(Utc::now),
    })
}

/// Get full rate limit status for all resources.
pub async fn get_rate_limits(client: &Octocrab) -> Result<GitHubRateLimitResponse, GitHubError> {
    // Fetch raw JSON to get all fields including those octocrab may not expose
    let response: GitHubRateLimitResponse = client
        .get("/rate_limit", None::<&()>)
        .await
        .map_err(GitHubError::Api)?;
    Ok(response)
}

/// GitHub API client implementing the `RemoteRepositoryClient` trait.
///
/// This wraps an `Octocrab` instance; pacing is layered on top with
/// [`RateLimitedClient`](crate::platform::RateLimitedClient).
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
}

impl GitHubClient {
    /// Create a new GitHub client from an optional authentication token.
    pub fn new(token: Option<&str>, api_url: Option<&str>) -> Result<Self, GitHubError> {
        let client = create_client(token, api_url)?;
        Ok(Self::from_octocrab(client))
    }

    /// Create a GitHub client from an existing Octocrab instance.
    pub fn from_octocrab(client: Octocrab) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    /// Full rate limit breakdown, used by the `limits` command.
    pub async fn get_rate_limits(&self) -> Result<GitHubRateLimitResponse, GitHubError> {
        get_rate_limits(&self.inner).await
    }

    async fn get_json<T, P>(
        &self,
        route: &str,
        params: Option<&P>,
        resource: &str,
    ) -> Result<T, GitHubError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        tracing::trace!(route, "GET");
        self.inner
            .get(route, params)
            .await
            .map_err(|e| classify(e, resource))
    }
}

fn repo_route(repo: &RepoSlug) -> String {
    format!("/repos/{}/{}", repo.owner(), repo.name())
}

#[async_trait]
impl RemoteRepositoryClient for GitHubClient {
    async fn exists(&self, repo: &RepoSlug) -> platform::Result<bool> {
        let resource = repo.to_string();
        match self
            .get_json::<serde_json::Value, ()>(&repo_route(repo), None, &resource)
            .await
        {
            Ok(_) => Ok(true),
            Err(GitHubError::NotFound(_)) => Ok(false),
            Err(e) => Err(RemoteError::from(e)),
        }
    }

    async fn get_file(&self, repo: &RepoSlug, path: &str) -> platform::Result<Vec<u8>> {
        let path = path.trim_start_matches('/');
        let route = format!("{}/contents/{}", repo_route(repo), path);
        let file: ContentFile = self
            .get_json::<ContentFile, ()>(&route, None, &format!("{repo}/{path}"))
            .await?;
        Ok(decode_content(file)?)
    }

    async fn list_workflows(&self, repo: &RepoSlug) -> platform::Result<Vec<String>> {
        let route = format!("{}/actions/workflows", repo_route(repo));
        match self
            .get_json::<WorkflowList, ()>(&route, None, &format!("{repo} workflows"))
            .await
        {
            Ok(list) => Ok(workflow_paths(list)),
            // Repositories with Actions disabled answer 404 here.
            Err(GitHubError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_releases(&self, repo: &RepoSlug) -> platform::Result<Vec<Release>> {
        let route = format!("{}/releases", repo_route(repo));
        let releases: Vec<GitHubRelease> = self
            .get_json(&route, Some(&ReleasesQuery::default()), &format!("{repo} releases"))
            .await?;
        Ok(releases.into_iter().map(to_release).collect())
    }

    async fn rate_limit(&self) -> platform::Result<RateLimitInfo> {
        get_rate_limit(&self.inner)
            .await
            .map_err(RemoteError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_client_is_remote_client() {
        fn assert_remote_client<T: RemoteRepositoryClient>() {}
        assert_remote_client::<GitHubClient>();
    }

    #[test]
    fn test_repo_route() {
        let repo = RepoSlug::new("eagle-cooler", "eagle-webdav").unwrap();
        assert_eq!(repo_route(&repo), "/repos/eagle-cooler/eagle-webdav");
    }

    #[tokio::test]
    async fn test_create_client_rejects_bad_base_uri() {
        assert!(create_client(None, Some("not a uri")).is_err());
    }
}
