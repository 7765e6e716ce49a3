//! Error types for the RADAE sync state machine

use thiserror::Error;

/// Sync FSM error types
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("receive buffer too short: need at least {need}, got {got}")]
    BufferTooShort { need: usize, got: usize },

    #[error("modem error: {0}")]
    Modem(#[from] radae_modem::ModemError),

    #[error("core error: {0}")]
    Core(#[from] radae_core::CoreError),
}

/// Result type for RADAE sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
