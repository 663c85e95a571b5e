//! Error types for the camsync application.

use camsync_core::CoreError;
use camsync_store::StoreError;
use camsync_sync::SyncError;
use thiserror::Error;

/// Errors surfaced by the application layer.
///
/// Only configuration errors are fatal; everything else is reported per
/// cycle and retried on the next one.
#[derive(Debug, Error)]
pub enum CamsyncError {
    /// Required settings absent from the environment.
    #[error("missing required settings: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// A setting is present but cannot be parsed.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// Camera map unreadable.
    #[error("cannot read camera map {path}: {source}")]
    CameraMapIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Core parsing error (camera map, naming mode, scheme).
    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Platform error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, CamsyncError>;
