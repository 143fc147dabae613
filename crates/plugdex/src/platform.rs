//! Platform-agnostic access to the remote hosting API.
//!
//! This module defines the `RemoteRepositoryClient` trait consumed by the
//! verifier and the localization resolver, the shared release types, and a
//! governor-backed wrapper that paces every remote call.
//!
//! # Example
//!
//! ```ignore
//! use plugdex::platform::{RemoteRepositoryClient, RepoSlug};
//!
//! async fn latest_tag<C: RemoteRepositoryClient>(client: &C, repo: &RepoSlug) -> Option<String> {
//!     let releases = client.list_releases(repo).await.ok()?;
//!     releases.into_iter().next().map(|r| r.tag)
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{RemoteError, RepoSlugError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, RateLimitedClient, rate_limits};
pub use types::{RateLimitInfo, Release, ReleaseAsset, RemoteRepositoryClient, RepoSlug};
