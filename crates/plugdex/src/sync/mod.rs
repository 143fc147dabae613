//! Catalog synchronization.
//!
//! This module ties verification to the on-disk catalog: scheduled sync
//! runs, manual submissions and on-demand verification.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncConfig`, outcomes, run and submission reports, constants
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - `SyncEngine`: `sync_all()`, `create_entry()`, `verify_one()`
//!
//! # Example
//!
//! ```ignore
//! use plugdex::catalog::{CatalogStore, Tier};
//! use plugdex::sync::{SyncConfig, SyncEngine};
//! use plugdex::verify::{Verifier, VerifyRules};
//!
//! async fn submit<C: plugdex::platform::RemoteRepositoryClient>(client: C) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = CatalogStore::load("index")?;
//!     let engine = SyncEngine::new(Verifier::new(client, VerifyRules::default()), SyncConfig::default());
//!     let report = engine
//!         .create_entry(&mut store, &"eagle-cooler/eagle-webdav".parse()?, Tier::Candidate, false)
//!         .await?;
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod engine;
mod progress;
mod types;

// Re-export types
pub use types::{
    CreateOutcome, CreateReport, EntryOutcome, EntryReport, SyncConfig, SyncError, SyncReport,
    SyncSummary,
};

// Re-export constants
pub use types::{
    DEFAULT_BLACKLIST_THRESHOLD, DEFAULT_MAX_BATCH_SIZE, DEFAULT_QUOTA_RESERVE,
    DEFAULT_STALENESS_DAYS,
};

// Re-export progress types
pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::{Candidate, Selection, SyncEngine, quota_cap, select};
