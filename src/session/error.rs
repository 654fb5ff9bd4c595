//! Session store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting sessions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write the sessions file.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the session mapping.
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create an IO error with the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
