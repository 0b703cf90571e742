//! Error types for voxsmoke.

use thiserror::Error;

/// The main error type for voxsmoke operations.
///
/// Out-of-range cell lookups and rays that miss the grid are not errors: they
/// resolve to a `0.0` density or `None` respectively.
#[derive(Error, Debug)]
pub enum SmokeError {
    /// An argument was rejected (non-positive voxel size, malformed bounds, bad config).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Data size mismatch between the grid and a buffer.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The density device failed a transfer or dispatch.
    #[error("device error: {0}")]
    Device(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SmokeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// A specialized Result type for voxsmoke operations.
pub type Result<T> = std::result::Result<T, SmokeError>;
