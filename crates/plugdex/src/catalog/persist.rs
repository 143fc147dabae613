//! JSON file helpers for the index directory.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use super::errors::{CatalogError, Result};

/// Read a JSON object file into a sorted map. A missing file is empty.
pub fn read_map<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Catalog file absent, starting empty");
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(CatalogError::io(path, e)),
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    serde_json::from_slice(&raw).map_err(|source| CatalogError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as 2-space pretty JSON and atomically replace `path`.
///
/// The temp file lives next to the target so the final rename never
/// crosses filesystems.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let persistence = |message: String| CatalogError::Persistence {
        path: path.to_path_buf(),
        message,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;

    let mut encoded = serde_json::to_string_pretty(value).map_err(|e| persistence(e.to_string()))?;
    encoded.push('\n');

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CatalogError::io(parent, e))?;
    tmp.write_all(encoded.as_bytes())
        .map_err(|e| persistence(e.to_string()))?;
    tmp.flush().map_err(|e| persistence(e.to_string()))?;
    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| persistence(e.error.to_string()))
}
