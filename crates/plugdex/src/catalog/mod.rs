//! The persistent plugin catalog.
//!
//! Four JSON files live in the index directory:
//!
//! - `alldex.json`: registry mapping every plugin id to its tier
//! - `candidate.json` / `primary.json`: the entries of each tier, keyed by id
//! - `blacklist.json`: verification failure counts keyed by `owner/name`
//!
//! [`CatalogStore`] loads them, keeps them consistent while they are
//! mutated and writes them back atomically.

mod errors;
mod persist;
mod store;
mod types;

pub use errors::{CatalogError, Result};
pub use persist::{read_map, write_json_atomic};
pub use store::{ALLDEX_FILE, BLACKLIST_FILE, CatalogStore};
pub use types::{
    BlacklistEntry, ConsistencyIssue, PluginEntry, Tier, UpsertOutcome, VersionRecord,
    parse_tag_version, serialized_name,
};
