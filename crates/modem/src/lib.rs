//! RADAE Modem - OFDM parameter derivation, pilot acquisition, channel
//! equalisation and per-frame demodulation.
//!
//! Everything in this crate is a pure numeric transform over buffers of
//! complex symbols: no stream I/O, no state-machine policy (that lives in
//! `radae-sync`).

pub mod acquisition;
pub mod demod;
pub mod equaliser;
pub mod error;
pub mod ofdm;

pub use error::{ModemError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        acquisition::{AcqConfig, Acquisition, CheckResult, DetectResult},
        demod::{DemodOutput, Demodulator},
        equaliser::{EqOutput, Equaliser},
        error::{ModemError, Result},
        ofdm::OfdmParams,
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
