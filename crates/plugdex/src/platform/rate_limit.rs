use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::errors::Result;
use super::types::{RateLimitInfo, Release, RemoteRepositoryClient, RepoSlug};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pacing for remote calls.
pub mod rate_limits {
    use std::time::Duration;

    /// Minimum delay between two calls that count against the quota.
    pub const MIN_CALL_INTERVAL: Duration = Duration::from_secs(1);

    /// Upper bound on remote calls made while verifying one repository
    /// (exists, workflows, releases, manifest, locale bundle).
    pub const CALLS_PER_ENTRY: usize = 5;
}

fn single_permit_quota(interval: Duration) -> Quota {
    let one = NonZeroU32::MIN;
    Quota::with_period(interval)
        .unwrap_or_else(|| Quota::per_second(one))
        .allow_burst(one)
}

/// A standalone pacing primitive: one permit per `interval`, no bursts.
///
/// Waiting is an await point, so a caller can wrap it in a timeout or drop
/// the future without blocking the runtime.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter that allows one call per `interval`.
    ///
    /// A zero interval falls back to one call per second.
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(single_permit_quota(interval))),
        }
    }

    /// Wait until the next call is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self::new(rate_limits::MIN_CALL_INTERVAL)
    }
}

/// A rate-limited wrapper around any `RemoteRepositoryClient`.
///
/// Every trait method waits for a permit before delegating, which enforces
/// the minimum inter-call delay the sync engine relies on.
///
/// # Example
///
/// ```ignore
/// use plugdex::platform::{RateLimitedClient, rate_limits};
/// use plugdex::github::GitHubClient;
///
/// let client = GitHubClient::new(Some(&token))?;
/// let client = RateLimitedClient::new(client, rate_limits::MIN_CALL_INTERVAL);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    /// Create a new rate-limited client wrapper.
    pub fn new(inner: C, interval: Duration) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(interval),
        }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn wait(&self) {
        self.limiter.wait().await;
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: RemoteRepositoryClient> RemoteRepositoryClient for RateLimitedClient<C> {
    async fn exists(&self, repo: &RepoSlug) -> Result<bool> {
        self.wait().await;
        self.inner.exists(repo).await
    }

    async fn get_file(&self, repo: &RepoSlug, path: &str) -> Result<Vec<u8>> {
        self.wait().await;
        self.inner.get_file(repo, path).await
    }

    async fn list_workflows(&self, repo: &RepoSlug) -> Result<Vec<String>> {
        self.wait().await;
        self.inner.list_workflows(repo).await
    }

    async fn list_releases(&self, repo: &RepoSlug) -> Result<Vec<Release>> {
        self.wait().await;
        self.inner.list_releases(repo).await
    }

    // Quota queries are free on GitHub, so they are not paced.
    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        self.inner.rate_limit().await
    }
}
