//! Error types for camsync core.

use thiserror::Error;

/// Errors that can occur while parsing core configuration values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Camera map JSON could not be parsed.
    #[error("invalid camera map: {0}")]
    InvalidCameraMap(String),

    /// Unknown naming mode string.
    #[error("unknown naming mode: {0} (expected \"simple\" or \"full\")")]
    UnknownNamingMode(String),

    /// Unknown stream URL scheme.
    #[error("unknown stream scheme: {0} (expected \"rtmp\" or \"rtsp\")")]
    UnknownScheme(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
