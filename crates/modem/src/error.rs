//! Error types for the RADAE modem

use thiserror::Error;

/// Modem error types
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("invalid OFDM parameters: {msg}")]
    InvalidParameters { msg: String },

    #[error("unsupported bottleneck mode: {bottleneck}")]
    UnsupportedBottleneck { bottleneck: u8 },

    #[error("demodulation failed: {msg}")]
    DemodulationFailed { msg: String },

    #[error("core error: {0}")]
    Core(#[from] radae_core::CoreError),
}

/// Result type for RADAE modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
