//! Batches the demodulator's per-modem-frame latents into reconstructed
//! feature blocks, driving the [`Decoder`] collaborator.

use crate::decoder::{Decoder, FEATURE_LEN, FRAMES_PER_STEP};
use crate::{CodecError, Result};

/// Wraps a [`Decoder`], turning `Nzmf` latent vectors per modem frame into
/// one flattened feature block (`Nzmf * FRAMES_PER_STEP * FEATURE_LEN`
/// floats — each latent vector's 40 ms covers `FRAMES_PER_STEP` 10 ms
/// output feature frames, §5, §8 property 1).
pub struct DecoderAdapter<D: Decoder> {
    decoder: D,
    latent_dim: usize,
    nzmf: usize,
    auxdata: bool,
}

impl<D: Decoder> DecoderAdapter<D> {
    pub fn new(decoder: D, latent_dim: usize, nzmf: usize, auxdata: bool) -> Self {
        Self {
            decoder,
            latent_dim,
            nzmf,
            auxdata,
        }
    }

    /// Reset the wrapped decoder. Called on every fresh
    /// `Candidate -> Sync` transition.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    /// Turn one modem frame's flattened `[Nzmf, latent_dim]` latents into
    /// a flattened `[Nzmf, FRAMES_PER_STEP, FEATURE_LEN]` feature block.
    pub fn process(&mut self, latents: &[f32]) -> Result<Vec<f32>> {
        let expected = self.nzmf * self.latent_dim;
        if latents.len() != expected {
            return Err(CodecError::DimensionMismatch {
                expected,
                actual: latents.len(),
            });
        }

        let mut out = Vec::with_capacity(self.nzmf * FRAMES_PER_STEP * FEATURE_LEN);
        for i in 0..self.nzmf {
            let chunk = &latents[i * self.latent_dim..(i + 1) * self.latent_dim];
            let frames = self.decoder.step(chunk)?;
            for mut frame in frames {
                if self.auxdata {
                    // The 21st feature carries the auxiliary UW bit (consumed
                    // upstream by the sync FSM's tally) rather than real
                    // vocoder data; zero it before emitting.
                    frame[20] = 0.0;
                }
                out.extend_from_slice(&frame);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{FileDecoder, VOCODER_LEN};

    fn adapter(auxdata: bool) -> DecoderAdapter<FileDecoder> {
        let latent_dim = 4;
        let weights = vec![0.0f32; VOCODER_LEN * latent_dim];
        let bias = vec![1.0f32; VOCODER_LEN];
        let decoder = FileDecoder::from_weights(latent_dim, weights, bias).unwrap();
        DecoderAdapter::new(decoder, latent_dim, 3, auxdata)
    }

    #[test]
    fn test_process_emits_nzmf_times_frames_per_step_feature_blocks() {
        let mut adapter = adapter(false);
        let latents = vec![0.0f32; 3 * 4];
        let out = adapter.process(&latents).unwrap();
        assert_eq!(out.len(), 3 * FRAMES_PER_STEP * FEATURE_LEN);
        for v in out.chunks(FEATURE_LEN) {
            assert_eq!(v[0], 1.0);
        }
    }

    #[test]
    fn test_auxdata_zeroes_21st_feature() {
        let mut adapter = adapter(true);
        let latents = vec![0.0f32; 3 * 4];
        let out = adapter.process(&latents).unwrap();
        for v in out.chunks(FEATURE_LEN) {
            assert_eq!(v[20], 0.0);
        }
    }

    #[test]
    fn test_wrong_latent_count_rejected() {
        let mut adapter = adapter(false);
        assert!(adapter.process(&[0.0f32; 3]).is_err());
    }
}
