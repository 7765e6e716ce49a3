//! Dense-matrix DFT primitives.
//!
//! The receiver's per-symbol transform size `M` is derived from the OFDM
//! parameters and is generally not a power of two, so `rustfft`-style
//! radix transforms don't apply. Instead we precompute the two small dense
//! matrices the modem actually needs — an inverse transform mapping `Nc`
//! carrier symbols onto `M` time-domain samples, and a forward transform
//! mapping `M` time-domain samples back onto `Nc` carrier bins — and apply
//! them by direct matrix-vector multiplication. `M` is small (order 100),
//! so this is cheap enough to run once per received symbol.

use crate::buffer::Complex;
use crate::{CoreError, Result};

/// A pair of dense DFT matrices for a fixed set of carrier angular
/// frequencies `w[0..Nc]` and transform size `M`.
///
/// `winv[c][m] = exp(+j*m*w[c]) / M` — modulates one carrier symbol onto
/// the `m`-th time sample.
/// `wfwd[m][c] = exp(-j*m*w[c])` — demodulates the `m`-th time sample onto
/// carrier `c`.
#[derive(Debug, Clone)]
pub struct DftPlan {
    m: usize,
    nc: usize,
    winv: Vec<Complex>,
    wfwd: Vec<Complex>,
}

impl DftPlan {
    /// Build the matrices from the per-carrier angular frequencies `w`
    /// (radians/sample) and the transform size `m_size`.
    pub fn new(w: &[f64], m_size: usize) -> Result<Self> {
        if w.is_empty() {
            return Err(CoreError::DftError {
                msg: "carrier frequency table must not be empty".to_string(),
            });
        }
        if m_size == 0 {
            return Err(CoreError::DftError {
                msg: "transform size must be greater than 0".to_string(),
            });
        }

        let nc = w.len();
        let mut winv = vec![Complex::ZERO; nc * m_size];
        let mut wfwd = vec![Complex::ZERO; m_size * nc];

        for (c, &wc) in w.iter().enumerate() {
            for m in 0..m_size {
                let theta = (m as f64) * wc;
                winv[c * m_size + m] = Complex::from_polar(1.0 / m_size as f64, theta);
                wfwd[m * nc + c] = Complex::from_polar(1.0, -theta);
            }
        }

        Ok(Self {
            m: m_size,
            nc,
            winv,
            wfwd,
        })
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn nc(&self) -> usize {
        self.nc
    }

    /// Modulate `Nc` carrier symbols onto `M` time-domain samples.
    pub fn modulate(&self, symbols: &[Complex]) -> Result<Vec<Complex>> {
        if symbols.len() != self.nc {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.nc,
                actual: symbols.len(),
            });
        }

        let mut time = vec![Complex::ZERO; self.m];
        for (c, &sym) in symbols.iter().enumerate() {
            let row = &self.winv[c * self.m..(c + 1) * self.m];
            for (m, &coeff) in row.iter().enumerate() {
                time[m] += sym * coeff;
            }
        }
        Ok(time)
    }

    /// Demodulate `M` time-domain samples back onto `Nc` carrier bins.
    pub fn demodulate(&self, time: &[Complex]) -> Result<Vec<Complex>> {
        if time.len() != self.m {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.m,
                actual: time.len(),
            });
        }

        let mut symbols = vec![Complex::ZERO; self.nc];
        for (m, &sample) in time.iter().enumerate() {
            let row = &self.wfwd[m * self.nc..(m + 1) * self.nc];
            for (c, &coeff) in row.iter().enumerate() {
                symbols[c] += sample * coeff;
            }
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier_freqs(lower: usize, nc: usize, m: usize) -> Vec<f64> {
        (0..nc)
            .map(|c| 2.0 * std::f64::consts::PI * (lower + c) as f64 / m as f64)
            .collect()
    }

    #[test]
    fn test_plan_construction() {
        let w = carrier_freqs(20, 8, 160);
        let plan = DftPlan::new(&w, 160).unwrap();
        assert_eq!(plan.m(), 160);
        assert_eq!(plan.nc(), 8);
    }

    #[test]
    fn test_modulate_demodulate_roundtrip() {
        let w = carrier_freqs(20, 8, 160);
        let plan = DftPlan::new(&w, 160).unwrap();

        let symbols: Vec<Complex> = (0..8)
            .map(|c| Complex::new((c as f64 + 1.0) * 0.3, -(c as f64) * 0.1))
            .collect();

        let time = plan.modulate(&symbols).unwrap();
        let recovered = plan.demodulate(&time).unwrap();

        for (a, b) in symbols.iter().zip(recovered.iter()) {
            assert!((a.real - b.real).abs() < 1e-9);
            assert!((a.imag - b.imag).abs() < 1e-9);
        }
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let w = carrier_freqs(20, 4, 64);
        let plan = DftPlan::new(&w, 64).unwrap();
        assert!(plan.modulate(&[Complex::ZERO; 3]).is_err());
        assert!(plan.demodulate(&[Complex::ZERO; 10]).is_err());
    }
}
