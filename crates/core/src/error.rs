//! Error types for RADAE Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate { rate: f64 },

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid filter parameters: {msg}")]
    InvalidFilterParameters { msg: String },

    #[error("DFT error: {msg}")]
    DftError { msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RADAE Core operations
pub type Result<T> = std::result::Result<T, CoreError>;
