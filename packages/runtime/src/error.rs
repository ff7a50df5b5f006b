//! Error types for the control runtime.

use ctrlbox_core_store::StreamError;
use thiserror::Error;

/// Errors that can occur while running the control loop.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An object operation failed.
    #[error("object error: {0}")]
    Object(#[from] ctrlbox_core_store::Error),

    /// The command channel refused output.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// The loop configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
