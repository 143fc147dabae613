//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::RemoteError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not decode response: {0}")]
    Decode(String),
}

// Re-export the shared short_error_message function from platform module
pub use crate::platform::short_error_message;

fn status_of(e: &octocrab::Error) -> Option<u16> {
    match e {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Check if an error indicates quota exhaustion.
///
/// A 429 always does. A 403 only does when GitHub says so in the message
/// (primary and secondary limits both mention "rate limit"); other 403s
/// such as blocked repositories concern a single repository.
pub fn is_rate_limit_error(e: &octocrab::Error) -> bool {
    match e {
        octocrab::Error::GitHub { source, .. } => match source.status_code.as_u16() {
            429 => true,
            403 => source.message.to_ascii_lowercase().contains("rate limit"),
            _ => false,
        },
        _ => false,
    }
}

/// Classify a raw octocrab error for the resource that was requested.
pub fn classify(e: octocrab::Error, resource: &str) -> GitHubError {
    if is_rate_limit_error(&e) {
        return GitHubError::RateLimited {
            reset_at: Utc::now(),
        };
    }
    match status_of(&e) {
        Some(404) => GitHubError::NotFound(resource.to_string()),
        Some(401) => GitHubError::AuthRequired,
        _ => match e {
            octocrab::Error::Json { .. } | octocrab::Error::Serde { .. } => {
                GitHubError::Decode(short_error_message(&e))
            }
            other => GitHubError::Api(other),
        },
    }
}

impl From<GitHubError> for RemoteError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { reset_at } => RemoteError::RateLimited { reset_at },
            GitHubError::AuthRequired => RemoteError::AuthRequired,
            GitHubError::NotFound(resource) => RemoteError::not_found(resource),
            GitHubError::Decode(msg) => RemoteError::malformed(msg),
            GitHubError::Api(e) if is_rate_limit_error(&e) => RemoteError::RateLimited {
                reset_at: Utc::now(),
            },
            GitHubError::Api(
                e @ (octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. }),
            ) => {
                RemoteError::network(short_error_message(&e))
            }
            GitHubError::Api(e) => RemoteError::api(short_error_message(&e)),
        }
    }
}
