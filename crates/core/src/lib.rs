//! RADAE Core - DSP primitives and signal processing
//!
//! This crate provides the fundamental building blocks shared by the
//! receive-side components of the RADAE modem: complex sample buffers,
//! real and complex FIR filtering (band-pass input conditioning), and a
//! dense-matrix DFT for the modem's non-power-of-two transform size.

pub mod buffer;
pub mod dft;
pub mod error;
pub mod filter;

pub use error::{CoreError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        buffer::{Complex, ComplexBuffer, SampleBuffer},
        dft::DftPlan,
        error::{CoreError, Result},
        filter::{ComplexFirFilter, Filter, FirFilter, IirFilter},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let result = 2 + 2;
        assert_eq!(result, 4);
    }
}