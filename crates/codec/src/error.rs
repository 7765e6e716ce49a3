//! Error types for the RADAE decoder adapter

use thiserror::Error;

/// Codec error types
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to load decoder weights from {path}: {msg}")]
    ModelLoadFailed { path: String, msg: String },

    #[error("dimension mismatch: expected {expected} latents, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("decoding failed: {msg}")]
    DecodingFailed { msg: String },

    #[error("core error: {0}")]
    Core(#[from] radae_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RADAE codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
