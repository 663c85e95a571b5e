//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while talking to the video platform.
///
/// Sink delivery never produces a `SyncError`: send results are reported as
/// [`SendOutcome`](crate::transport::SendOutcome)s and classified by policy.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials rejected or login response malformed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Directory query for one group failed.
    #[error("directory query for {key} failed: {message}")]
    Directory { key: String, message: String },

    /// Transport-level error (connect, timeout, decode).
    #[error("transport error: {0}")]
    Transport(String),

    /// Every configured group failed to resolve.
    #[error("snapshot collection failed for all {groups} groups")]
    CollectFailed { groups: usize },
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
