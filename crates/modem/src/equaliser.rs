//! Pilot-based channel estimation, equalisation and coarse magnitude AGC.

use crate::ofdm::OfdmParams;
use crate::{ModemError, Result};
use radae_core::buffer::Complex;

/// Per-carrier delay-spread model constant: `a = 0.0025 * Fs` samples.
const A_FRACTION_OF_FS: f64 = 0.0025;

/// Output of one [`Equaliser::equalise`] call: `Ns` rows of `Nc`
/// equalised data symbols plus the coarse magnitude that was divided out.
#[derive(Debug, Clone)]
pub struct EqOutput {
    /// Flattened `[Ns, Nc]` row-major equalised data symbols.
    pub symbols: Vec<Complex>,
    pub mag: f64,
}

/// Pilot-based channel equaliser. Carries the previous frame's smoothed
/// pilot estimate and slope across calls so data rows can be interpolated
/// between consecutive pilot rows.
#[derive(Debug, Clone)]
pub struct Equaliser {
    phase_mag_eq: bool,
    prev_pilot: Option<Vec<Complex>>,
    prev_slope: Option<Vec<Complex>>,
}

impl Equaliser {
    pub fn new(phase_mag_eq: bool) -> Self {
        Self {
            phase_mag_eq,
            prev_pilot: None,
            prev_slope: None,
        }
    }

    /// Clear carried-over pilot/slope state. Called on every fresh
    /// `Candidate -> Sync` transition.
    pub fn reset(&mut self) {
        self.prev_pilot = None;
        self.prev_slope = None;
    }

    /// Solve the local 3-tap least-squares delay model around carrier `c`
    /// and return the smoothed pilot estimate `g0 + g1*exp(-j*w[c]*a)`, or
    /// `None` if the 2x2 normal-equations matrix is numerically singular.
    fn smoothed_pilot(params: &OfdmParams, pilot_row: &[Complex], c: usize) -> Option<Complex> {
        let nc = params.nc;
        let c_mid = c.clamp(1, nc.saturating_sub(2));
        let a = A_FRACTION_OF_FS * params.fs;
        let idxs = [c_mid - 1, c_mid, c_mid + 1];

        // A is 3x2, rows [1, exp(-j*w[idx]*a)]; h is 3x1.
        let mut a_mat = [[Complex::ZERO; 2]; 3];
        let mut h = [Complex::ZERO; 3];
        for (row, &ci) in idxs.iter().enumerate() {
            let theta = -params.w[ci] * a;
            a_mat[row][0] = Complex::new(1.0, 0.0);
            a_mat[row][1] = Complex::from_polar(1.0, theta);
            h[row] = pilot_row[ci] / params.pilot_carriers[ci];
        }

        // Normal equations: (A^H A) g = A^H h, A^H A is 2x2 Hermitian.
        let mut aha = [[Complex::ZERO; 2]; 2];
        let mut ahh = [Complex::ZERO; 2];
        for row in 0..3 {
            for i in 0..2 {
                ahh[i] += a_mat[row][i].conj() * h[row];
                for j in 0..2 {
                    aha[i][j] += a_mat[row][i].conj() * a_mat[row][j];
                }
            }
        }

        let det = aha[0][0] * aha[1][1] - aha[0][1] * aha[1][0];
        let scale = aha[0][0].norm() + aha[1][1].norm() + 1.0;
        if det.norm() < f64::EPSILON.sqrt() * scale {
            return None;
        }

        let inv00 = aha[1][1] / det;
        let inv01 = (aha[0][1] * Complex::new(-1.0, 0.0)) / det;
        let inv10 = (aha[1][0] * Complex::new(-1.0, 0.0)) / det;
        let inv11 = aha[0][0] / det;

        let g0 = inv00 * ahh[0] + inv01 * ahh[1];
        let g1 = inv10 * ahh[0] + inv11 * ahh[1];

        let theta_c = -params.w[c] * a;
        Some(g0 + g1 * Complex::from_polar(1.0, theta_c))
    }

    /// Estimate the smoothed pilot row, one value per carrier. Carriers
    /// whose local LS model is singular fall back to the raw per-carrier
    /// pilot ratio (§7 numerical fallback).
    fn estimate_pilot_row(params: &OfdmParams, pilot_row: &[Complex]) -> Vec<Complex> {
        (0..params.nc)
            .map(|c| {
                Self::smoothed_pilot(params, pilot_row, c)
                    .unwrap_or(pilot_row[c] / params.pilot_carriers[c])
            })
            .collect()
    }

    /// Equalise one modem frame's worth of symbols.
    ///
    /// `rx_sym` is the flattened `[Ns+1, Nc]` row-major demapped symbols,
    /// row 0 the pilot row. When `is_final_frame` is set (the frame
    /// immediately preceding an end-of-over), the previously stored slope
    /// is reused rather than recomputed, per §4.4.
    pub fn equalise(
        &mut self,
        params: &OfdmParams,
        rx_sym: &[Complex],
        is_final_frame: bool,
    ) -> Result<EqOutput> {
        let nc = params.nc;
        let ns = params.ns;
        if rx_sym.len() != (ns + 1) * nc {
            return Err(ModemError::InvalidParameters {
                msg: format!(
                    "expected {} symbols, got {}",
                    (ns + 1) * nc,
                    rx_sym.len()
                ),
            });
        }

        let pilot_row = &rx_sym[0..nc];
        let smoothed = Self::estimate_pilot_row(params, pilot_row);

        let prev = self.prev_pilot.clone().unwrap_or_else(|| smoothed.clone());
        let slope = if is_final_frame {
            self.prev_slope
                .clone()
                .unwrap_or_else(|| vec![Complex::ZERO; nc])
        } else {
            (0..nc)
                .map(|c| (smoothed[c] - prev[c]) / (ns as f64 + 1.0))
                .collect()
        };

        let mut out = vec![Complex::ZERO; ns * nc];
        for k in 1..=ns {
            for c in 0..nc {
                let rx_ch = prev[c] + slope[c] * (k as f64);
                let sym = rx_sym[k * nc + c];
                let eq = if self.phase_mag_eq {
                    sym / rx_ch
                } else {
                    sym * Complex::from_polar(1.0, -rx_ch.phase())
                };
                out[(k - 1) * nc + c] = eq;
            }
        }

        let mag_sqr_sum: f64 = smoothed.iter().map(|v| v.norm_sqr()).sum();
        let mut mag = (mag_sqr_sum / nc as f64).sqrt();
        if params.bottleneck == 3 {
            mag *= params.pilot_carriers[0].norm() / params.pilot_gain;
        }
        if mag.abs() > 1e-12 {
            for v in out.iter_mut() {
                *v = *v / mag;
            }
        }

        self.prev_pilot = Some(smoothed);
        self.prev_slope = Some(slope);

        Ok(EqOutput { symbols: out, mag })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofdm::{LATENT_DIM_DEFAULT, NZMF_DEFAULT};

    fn params() -> OfdmParams {
        OfdmParams::new(8000.0, LATENT_DIM_DEFAULT, NZMF_DEFAULT, 3, 0.004).unwrap()
    }

    /// Build a clean `[Ns+1, Nc]` frame for a flat, unit-gain channel:
    /// pilot row is `P`, data rows are unit QPSK symbols.
    fn clean_frame(params: &OfdmParams) -> Vec<Complex> {
        let nc = params.nc;
        let ns = params.ns;
        let mut frame = vec![Complex::ZERO; (ns + 1) * nc];
        frame[0..nc].copy_from_slice(&params.pilot_carriers);
        let qpsk = Complex::new(1.0, 1.0) * (1.0 / 2.0_f64.sqrt());
        for k in 1..=ns {
            for c in 0..nc {
                frame[k * nc + c] = qpsk;
            }
        }
        frame
    }

    #[test]
    fn test_equalise_recovers_clean_symbols() {
        let params = params();
        let mut eq = Equaliser::new(false);
        let frame = clean_frame(&params);

        // prime prev_pilot with the same pilot so slope is zero.
        let out1 = eq.equalise(&params, &frame, false).unwrap();
        let out2 = eq.equalise(&params, &frame, false).unwrap();

        for sym in &out2.symbols {
            assert!((sym.real - 1.0 / 2.0_f64.sqrt()).abs() < 1e-6);
            assert!((sym.imag - 1.0 / 2.0_f64.sqrt()).abs() < 1e-6);
        }
        assert!(out1.mag > 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let params = params();
        let mut eq = Equaliser::new(false);
        let frame = clean_frame(&params);
        eq.equalise(&params, &frame, false).unwrap();
        eq.reset();
        assert!(eq.prev_pilot.is_none());
        assert!(eq.prev_slope.is_none());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let params = params();
        let mut eq = Equaliser::new(false);
        assert!(eq.equalise(&params, &[Complex::ZERO; 3], false).is_err());
    }

    #[test]
    fn test_final_frame_reuses_previous_slope() {
        let params = params();
        let mut eq = Equaliser::new(false);
        let frame = clean_frame(&params);
        eq.equalise(&params, &frame, false).unwrap();
        let slope_after_first = eq.prev_slope.clone().unwrap();
        eq.equalise(&params, &frame, true).unwrap();
        assert_eq!(eq.prev_slope.clone().unwrap(), slope_after_first);
    }
}
