//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur while saving the cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cache serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Injected failure (memory store only).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
