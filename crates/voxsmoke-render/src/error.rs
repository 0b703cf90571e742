//! GPU backend error types.

use thiserror::Error;
use voxsmoke_core::SmokeError;

/// Errors that can occur in the wgpu backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Buffer size does not match the data.
    #[error("buffer size mismatch: expected {expected} records, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Mapping a staging buffer for readback failed.
    #[error("buffer map failed: {0}")]
    BufferMapFailed(String),

    /// A dispatch was requested before its targets were set.
    #[error("missing render target: {0}")]
    MissingTarget(&'static str),

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,
}

/// A specialized Result type for GPU operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for SmokeError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::SizeMismatch { expected, actual } => {
                SmokeError::SizeMismatch { expected, actual }
            }
            other => SmokeError::Device(other.to_string()),
        }
    }
}
