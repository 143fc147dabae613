use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not write {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    #[error(
        "Could not write {}: {message} (already written: {})",
        path.display(),
        display_paths(written)
    )]
    PartialPersist {
        path: PathBuf,
        written: Vec<PathBuf>,
        message: String,
    },

    #[error("Catalog invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Not found in catalog: {0}")]
    NotFound(String),
}

impl CatalogError {
    /// Create an invariant violation error.
    #[inline]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
