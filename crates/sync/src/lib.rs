//! RADAE Sync - the three-state sync controller.
//!
//! Owns the sliding receive buffer and drives acquisition/demodulation per
//! iteration, deciding when a candidate is promoted to lock and when lock
//! is dropped.

pub mod error;
pub mod fsm;

pub use error::{Result, SyncError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        error::{Result, SyncError},
        fsm::{RxState, StepOutput, SyncFsm},
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn it_works() {
        let result = 2 + 2;
        assert_eq!(result, 4);
    }
}
