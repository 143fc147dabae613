//! GitHub implementation of the remote repository accessor.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - REST payload shapes and rate limit responses
//! - [`client`] - Client creation and the `RemoteRepositoryClient` impl
//! - [`convert`] - Payload conversion to platform-agnostic types
//!
//! ```ignore
//! use plugdex::github::GitHubClient;
//! use plugdex::platform::{RateLimitedClient, rate_limits};
//!
//! let client = GitHubClient::new(Some(&token), None)?;
//! let client = RateLimitedClient::new(client, rate_limits::MIN_CALL_INTERVAL);
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use error::{GitHubError, is_rate_limit_error};

pub use types::{
    GitHubRateLimitResponse, GitHubRateLimits, RELEASES_PER_PAGE, RateLimitResource,
};

pub use client::{GitHubClient, create_client, get_rate_limit, get_rate_limits};

pub use crate::platform::RateLimitInfo;
