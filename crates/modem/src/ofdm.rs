//! OFDM parameter derivation shared by acquisition, equalisation and
//! demodulation.
//!
//! `OfdmParams` is constructed once from the handful of knobs the decoder
//! exposes (`Fs`, `latent_dim`, `Nzmf`, `bottleneck`) and is immutable
//! afterwards; every other modem component borrows it.

use crate::{ModemError, Result};
use radae_core::buffer::Complex;
use radae_core::dft::DftPlan;

/// Barker-13 sequence, the base pilot pattern wrapped/tiled to `Nc` carriers.
const BARKER13: [f64; 13] = [
    1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0,
];

/// Number of latent vectors folded into one reconstructed vocoder frame
/// block (one call to the decoder's `step`).
pub const NZMF_DEFAULT: usize = 3;
pub const LATENT_DIM_DEFAULT: usize = 80;
const TZ: f64 = 0.04;
const TS: f64 = 0.03;
const BPS: usize = 2;

/// Immutable OFDM parameters derived from the decoder/codec configuration.
#[derive(Debug, Clone)]
pub struct OfdmParams {
    pub fs: f64,
    pub rs: f64,
    pub m: usize,
    pub ncp: usize,
    pub nc: usize,
    pub ns: usize,
    pub nzmf: usize,
    pub latent_dim: usize,
    pub w: Vec<f64>,
    pub p: Vec<Complex>,
    pub pend: Vec<Complex>,
    pub pilot_carriers: Vec<Complex>,
    pub pilot_gain: f64,
    pub bottleneck: u8,
    pub time_offset: isize,
    pub coarse_mag: bool,
    dft: DftPlan,
}

impl OfdmParams {
    /// Derive the full parameter set. `cyclic_prefix` is the CP duration in
    /// seconds (default `0.004`, i.e. `Ncp = 32` at `Fs = 8000`).
    pub fn new(
        fs: f64,
        latent_dim: usize,
        nzmf: usize,
        bottleneck: u8,
        cyclic_prefix: f64,
    ) -> Result<Self> {
        if !(1..=3).contains(&bottleneck) {
            return Err(ModemError::UnsupportedBottleneck { bottleneck });
        }

        let rs = 1.0 / TS;

        let ns = ((nzmf as f64) * TZ / TS).floor() as usize;
        let nsmf = nzmf * latent_dim / BPS;
        if ns == 0 {
            return Err(ModemError::InvalidParameters {
                msg: "Ns derived as zero".to_string(),
            });
        }
        let nc = nsmf / ns;
        if ns * nc * BPS != nzmf * latent_dim {
            return Err(ModemError::InvalidParameters {
                msg: format!(
                    "Ns*Nc*bps ({}) != Nzmf*latent_dim ({})",
                    ns * nc * BPS,
                    nzmf * latent_dim
                ),
            });
        }

        let ncp = (cyclic_prefix * fs).round() as usize;
        let ts_prime = TS * ns as f64 / (ns as f64 + 1.0) - ncp as f64 / fs;
        if ts_prime <= 0.0 {
            return Err(ModemError::InvalidParameters {
                msg: "derived symbol period is non-positive".to_string(),
            });
        }
        let rs_prime = 1.0 / ts_prime;
        let m = (fs / rs_prime).round() as usize;

        let lower = (400.0 / rs_prime).round() as usize;
        let w: Vec<f64> = (0..nc)
            .map(|c| 2.0 * std::f64::consts::PI * (lower + c) as f64 / m as f64)
            .collect();

        let dft = DftPlan::new(&w, m).map_err(ModemError::Core)?;

        let pilot_carriers: Vec<Complex> = (0..nc)
            .map(|c| Complex::new(BARKER13[c % BARKER13.len()] * 2.0_f64.sqrt(), 0.0))
            .collect();

        let p = dft.modulate(&pilot_carriers).map_err(ModemError::Core)?;
        // pend: no distinct end-of-over pilot sequence is available from the
        // transmit side (out of scope, see §1); reuse `p` until a distinct
        // sequence is wired in by a caller.
        let pend = p.clone();

        let pilot_gain = if bottleneck == 3 {
            10f64.powf(-2.0 / 20.0) * m as f64 / (nc as f64).sqrt()
        } else {
            1.0
        };

        tracing::debug!(m, ncp, nc, ns, pilot_gain, "derived OFDM parameters");

        Ok(Self {
            fs,
            rs,
            m,
            ncp,
            nc,
            ns,
            nzmf,
            latent_dim,
            w,
            p,
            pend,
            pilot_carriers,
            pilot_gain,
            bottleneck,
            time_offset: -16,
            coarse_mag: true,
            dft,
        })
    }

    /// Samples per modem frame: `(Ns+1)*(M+Ncp)`.
    pub fn nmf(&self) -> usize {
        (self.ns + 1) * (self.m + self.ncp)
    }

    /// Access the dense DFT matrices for this parameter set.
    pub fn dft(&self) -> &DftPlan {
        &self.dft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> OfdmParams {
        OfdmParams::new(8000.0, LATENT_DIM_DEFAULT, NZMF_DEFAULT, 3, 0.004).unwrap()
    }

    #[test]
    fn test_default_construction() {
        let p = default_params();
        assert_eq!(p.ncp, 32);
        assert_eq!(p.ns, 4);
        assert_eq!(p.nc, 30);
        assert_eq!(p.ns * p.nc * BPS, p.nzmf * p.latent_dim);
    }

    #[test]
    fn test_nmf_matches_formula() {
        let p = default_params();
        assert_eq!(p.nmf(), (p.ns + 1) * (p.m + p.ncp));
    }

    #[test]
    fn test_pilot_gain_only_applies_to_bottleneck_three() {
        let p3 = OfdmParams::new(8000.0, LATENT_DIM_DEFAULT, NZMF_DEFAULT, 3, 0.004).unwrap();
        let p1 = OfdmParams::new(8000.0, LATENT_DIM_DEFAULT, NZMF_DEFAULT, 1, 0.004).unwrap();
        assert!(p3.pilot_gain != 1.0);
        assert_eq!(p1.pilot_gain, 1.0);
    }

    #[test]
    fn test_invalid_bottleneck_rejected() {
        assert!(OfdmParams::new(8000.0, LATENT_DIM_DEFAULT, NZMF_DEFAULT, 9, 0.004).is_err());
    }

    #[test]
    fn test_pilot_sequence_has_unit_scaled_magnitude() {
        let p = default_params();
        for pilot in &p.pilot_carriers {
            assert!((pilot.norm() - 2.0_f64.sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_p_and_pend_have_time_domain_length_m() {
        let p = default_params();
        assert_eq!(p.p.len(), p.m);
        assert_eq!(p.pend.len(), p.m);
    }
}
