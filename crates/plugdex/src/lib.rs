//! Plugdex - verification and synchronization for a community plugin catalog.
//!
//! The catalog lives in a directory of JSON files: a registry (`alldex.json`)
//! mapping plugin ids to tiers, one file per tier (`candidate.json`,
//! `primary.json`) and a failure ledger (`blacklist.json`). Entries are
//! admitted and kept fresh by verifying their source repositories remotely.
//!
//! # Features
//!
//! - `github` (default) - Enables [`github::GitHubClient`], the octocrab-backed
//!   implementation of [`platform::RemoteRepositoryClient`].
//!
//! # Example
//!
//! ```ignore
//! use plugdex::{CatalogStore, GitHubClient, RateLimitedClient, SyncConfig, SyncEngine};
//! use plugdex::verify::{Verifier, VerifyRules};
//!
//! let config = SyncConfig::default();
//! let client = RateLimitedClient::new(GitHubClient::new(token, None)?, config.min_call_interval);
//! let engine = SyncEngine::new(Verifier::new(client, VerifyRules::default()), config);
//!
//! let mut store = CatalogStore::load("index")?;
//! let report = engine.sync_all(&mut store, None).await;
//! ```

pub mod catalog;
pub mod localization;
pub mod platform;
pub mod sync;
pub mod verify;

#[cfg(feature = "github")]
pub mod github;

pub use catalog::{CatalogError, CatalogStore, PluginEntry, Tier};
#[cfg(feature = "github")]
pub use github::GitHubClient;
pub use platform::{
    ApiRateLimiter, RateLimitInfo, RateLimitedClient, RemoteError, RemoteRepositoryClient,
    RepoSlug, rate_limits,
};
pub use sync::{SyncConfig, SyncEngine, SyncError, SyncReport};
pub use verify::{VerificationResult, Verifier, VerifyRules};
