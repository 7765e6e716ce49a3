//! RADAE Codec - the decoder collaborator boundary.
//!
//! The learned vocoder decoder is out of scope (§1). This crate provides
//! the `Decoder` trait that isolates it, a placeholder affine
//! implementation, and the adapter that batches per-modem-frame latents
//! into reconstructed feature blocks.

pub mod adapter;
pub mod decoder;
pub mod error;

pub use error::{CodecError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        adapter::DecoderAdapter,
        decoder::{Decoder, FileDecoder, FEATURE_LEN, FRAMES_PER_STEP, VOCODER_LEN},
        error::{CodecError, Result},
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
