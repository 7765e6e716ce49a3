//! The `Decoder` collaborator trait and a placeholder file-backed
//! implementation.
//!
//! The real neural decoder is out of scope (§1): it is a black-box
//! stateful function mapping one `latent_dim`-wide latent vector onto one
//! reconstructed vocoder feature frame. `Decoder` isolates that boundary
//! behind a trait so any runtime (an ONNX session, a hand-rolled
//! inference loop, or — here — a trivial affine stand-in) can back it.

use crate::{CodecError, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Used vocoder features per reconstructed frame (the remaining 16 of the
/// 36-float output frame are padding zeros, §6).
pub const VOCODER_LEN: usize = 20;
/// Total output feature frame length, including padding.
pub const FEATURE_LEN: usize = 36;
/// Feature frames produced per decoder `step` call: one 40 ms latent
/// vector covers `FRAMES_PER_STEP` 10 ms output feature frames (`dec_stride`
/// in the original, §5, §8 property 1, §9).
pub const FRAMES_PER_STEP: usize = 4;

/// Stateful decoder collaborator: resettable, consumes one latent vector
/// per call and produces `FRAMES_PER_STEP` feature frames.
pub trait Decoder {
    /// Clear any internal state. Called on every fresh `Candidate -> Sync`
    /// transition.
    fn reset(&mut self);

    /// Decode one `latent_dim`-wide latent vector into `FRAMES_PER_STEP`
    /// feature frames of `FEATURE_LEN` floats each (`VOCODER_LEN` used per
    /// frame, the rest zero-padded).
    fn step(&mut self, latent: &[f32]) -> Result<[[f32; FEATURE_LEN]; FRAMES_PER_STEP]>;
}

/// Placeholder decoder backed by a flat weight file: a fixed affine map
/// `y = W*x + b`, `W` shape `[VOCODER_LEN, latent_dim]`, `b` shape
/// `[VOCODER_LEN]`, stored as consecutive little-endian `f32`s
/// (`W` row-major, followed by `b`). Stands in for the neural decoder so
/// the adapter and CLI are exercisable without a real model.
pub struct FileDecoder {
    latent_dim: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl FileDecoder {
    pub fn load(path: &Path, latent_dim: usize) -> Result<Self> {
        let mut file = fs::File::open(path).map_err(CodecError::Io)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(CodecError::Io)?;

        let expected_len = (VOCODER_LEN * latent_dim + VOCODER_LEN) * 4;
        if bytes.len() != expected_len {
            return Err(CodecError::ModelLoadFailed {
                path: path.display().to_string(),
                msg: format!(
                    "expected {} bytes of weights, found {}",
                    expected_len,
                    bytes.len()
                ),
            });
        }

        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let (weights, bias) = floats.split_at(VOCODER_LEN * latent_dim);

        Ok(Self {
            latent_dim,
            weights: weights.to_vec(),
            bias: bias.to_vec(),
        })
    }

    /// Build a `FileDecoder` directly from in-memory weights, mainly for
    /// tests.
    pub fn from_weights(latent_dim: usize, weights: Vec<f32>, bias: Vec<f32>) -> Result<Self> {
        if weights.len() != VOCODER_LEN * latent_dim || bias.len() != VOCODER_LEN {
            return Err(CodecError::DimensionMismatch {
                expected: VOCODER_LEN * latent_dim,
                actual: weights.len(),
            });
        }
        Ok(Self {
            latent_dim,
            weights,
            bias,
        })
    }
}

impl Decoder for FileDecoder {
    fn reset(&mut self) {
        // stateless affine map: nothing to clear
    }

    fn step(&mut self, latent: &[f32]) -> Result<[[f32; FEATURE_LEN]; FRAMES_PER_STEP]> {
        if latent.len() != self.latent_dim {
            return Err(CodecError::DimensionMismatch {
                expected: self.latent_dim,
                actual: latent.len(),
            });
        }

        let mut frame = [0.0f32; FEATURE_LEN];
        for row in 0..VOCODER_LEN {
            let w_row = &self.weights[row * self.latent_dim..(row + 1) * self.latent_dim];
            let mut acc = self.bias[row];
            for (w, x) in w_row.iter().zip(latent.iter()) {
                acc += w * x;
            }
            frame[row] = acc;
        }
        // stateless affine map: the same reconstructed frame covers all
        // FRAMES_PER_STEP 10 ms output slots for this 40 ms latent.
        Ok([frame; FRAMES_PER_STEP])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_like_decoder_passes_through_first_features() {
        let latent_dim = 4;
        let mut weights = vec![0.0f32; VOCODER_LEN * latent_dim];
        for i in 0..latent_dim.min(VOCODER_LEN) {
            weights[i * latent_dim + i] = 1.0;
        }
        let bias = vec![0.0f32; VOCODER_LEN];
        let mut decoder = FileDecoder::from_weights(latent_dim, weights, bias).unwrap();

        let latent = vec![1.0, 2.0, 3.0, 4.0];
        let frames = decoder.step(&latent).unwrap();
        assert_eq!(frames.len(), FRAMES_PER_STEP);
        for frame in &frames {
            assert_eq!(&frame[0..4], &latent[..]);
            assert_eq!(frame.len(), FEATURE_LEN);
            for v in &frame[VOCODER_LEN..] {
                assert_eq!(*v, 0.0);
            }
        }
    }

    #[test]
    fn test_wrong_latent_dim_rejected() {
        let mut decoder = FileDecoder::from_weights(4, vec![0.0; VOCODER_LEN * 4], vec![0.0; VOCODER_LEN]).unwrap();
        assert!(decoder.step(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_load_roundtrip_from_bytes() {
        let latent_dim = 2;
        let weights = vec![0.5f32; VOCODER_LEN * latent_dim];
        let bias = vec![0.1f32; VOCODER_LEN];

        let mut bytes = Vec::new();
        for w in &weights {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        for b in &bias {
            bytes.extend_from_slice(&b.to_le_bytes());
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, &bytes).unwrap();

        let mut decoder = FileDecoder::load(&path, latent_dim).unwrap();
        let frames = decoder.step(&[1.0, 1.0]).unwrap();
        for frame in &frames {
            assert!((frame[0] - (0.5 + 0.5 + 0.1)).abs() < 1e-6);
        }
    }
}
