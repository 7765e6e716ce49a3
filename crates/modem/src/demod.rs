//! Per-frame OFDM demodulation: cyclic-prefix removal, DFT, equalisation
//! and QPSK demapping.

use crate::equaliser::Equaliser;
use crate::ofdm::OfdmParams;
use crate::{ModemError, Result};
use radae_core::buffer::Complex;

/// Output of demodulating one modem frame.
#[derive(Debug, Clone)]
pub struct DemodOutput {
    /// Recovered latent vector(s), `Nzmf * latent_dim` floats, QPSK-demapped
    /// real/imaginary pairs interleaved per symbol.
    pub latents: Vec<f32>,
    /// Coarse magnitude estimate that was divided out by the equaliser.
    pub mag: f64,
}

/// OFDM demodulator: owns the equaliser's carried-over pilot/slope state.
#[derive(Debug, Clone)]
pub struct Demodulator {
    eq: Equaliser,
}

impl Demodulator {
    pub fn new(phase_mag_eq: bool) -> Self {
        Self {
            eq: Equaliser::new(phase_mag_eq),
        }
    }

    /// Reset equaliser state. Called on every fresh `Candidate -> Sync`
    /// transition (§4.6).
    pub fn reset(&mut self) {
        self.eq.reset();
    }

    /// Demodulate one modem frame's worth of raw time-domain samples,
    /// shaped `(Ns+1)*(M+Ncp)`.
    pub fn demodulate(
        &mut self,
        params: &OfdmParams,
        samples: &[Complex],
        is_final_frame: bool,
    ) -> Result<DemodOutput> {
        let rows = params.ns + 1;
        let cols = params.m + params.ncp;
        if samples.len() != rows * cols {
            return Err(ModemError::DemodulationFailed {
                msg: format!("expected {} samples, got {}", rows * cols, samples.len()),
            });
        }

        let start = (params.ncp as isize + params.time_offset) as usize;
        if start + params.m > cols {
            return Err(ModemError::DemodulationFailed {
                msg: "time_offset places the DFT window outside the symbol".to_string(),
            });
        }

        let mut rx_sym = vec![Complex::ZERO; rows * params.nc];
        for r in 0..rows {
            let row = &samples[r * cols..(r + 1) * cols];
            let window = &row[start..start + params.m];
            let freq = params.dft().demodulate(window).map_err(ModemError::Core)?;
            rx_sym[r * params.nc..(r + 1) * params.nc].copy_from_slice(&freq);
        }

        let eq_out = self.eq.equalise(params, &rx_sym, is_final_frame)?;
        let latents = Self::qpsk_demap(&eq_out.symbols, params.nzmf, params.latent_dim)?;

        Ok(DemodOutput {
            latents,
            mag: eq_out.mag,
        })
    }

    /// QPSK demap: `(Re(s), Im(s))` interleaved per data symbol, reshaped
    /// to `[Nzmf, latent_dim]` and flattened.
    fn qpsk_demap(symbols: &[Complex], nzmf: usize, latent_dim: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(symbols.len() * 2);
        for s in symbols {
            out.push(s.real as f32);
            out.push(s.imag as f32);
        }
        if out.len() != nzmf * latent_dim {
            return Err(ModemError::DemodulationFailed {
                msg: format!(
                    "expected {} demapped values, got {}",
                    nzmf * latent_dim,
                    out.len()
                ),
            });
        }
        Ok(out)
    }
}
