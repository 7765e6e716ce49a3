//! The receiver's read-process-write loop: stdin samples through the band-
//! pass filter and sync FSM, decoded feature frames to stdout.

use anyhow::{Context, Result};
use radae_codec::adapter::DecoderAdapter;
use radae_codec::decoder::FileDecoder;
use radae_core::buffer::Complex;
use radae_core::filter::ComplexFirFilter;
use radae_modem::ofdm::OfdmParams;
use radae_sync::fsm::{RxState, SyncFsm};
use std::io::{Read, Write};

use crate::config::ReceiverConfig;

/// Complex FIR length for the input band-pass filter (§4.1).
const BPF_TAPS: usize = 101;
/// Band-pass margin factor applied over the carrier spread (§4.1).
const BPF_MARGIN: f64 = 1.2;

/// Owns the receive pipeline: optional band-pass filter, the sync FSM, and
/// the decoder adapter that turns recovered latents into feature frames.
pub struct Driver {
    bpf: Option<ComplexFirFilter>,
    fsm: SyncFsm,
    adapter: DecoderAdapter<FileDecoder>,
    write_latent: Option<Vec<f32>>,
    ber_reference: Option<Vec<f32>>,
    ber_errors: u64,
    ber_bits: u64,
    fmax_target: Option<f64>,
    fmax_target_reported: bool,
}

impl Driver {
    pub fn new(config: &ReceiverConfig) -> Result<Self> {
        let params = OfdmParams::new(8000.0, config.latent_dim, 3, config.bottleneck, 0.004)
            .context("failed to derive OFDM parameters")?;

        let bpf = if config.no_bpf {
            None
        } else {
            let lo = params.w[0] * params.fs / std::f64::consts::TAU;
            let hi = params.w[params.nc - 1] * params.fs / std::f64::consts::TAU;
            let centre = (lo + hi) / 2.0;
            let bandwidth = BPF_MARGIN * (hi - lo);
            Some(
                ComplexFirFilter::bandpass(centre, bandwidth, params.fs, BPF_TAPS)
                    .context("failed to design band-pass filter")?,
            )
        };

        let mut fsm = SyncFsm::new(params, true, config.auxdata);
        if let Some(secs) = config.disable_unsync {
            fsm.set_disable_unsync_after(secs);
        }
        if let Some(hz) = config.foff_err {
            fsm.set_foff_err(hz);
        }

        let decoder = FileDecoder::load(&config.model, config.latent_dim)
            .with_context(|| format!("failed to load decoder weights from {:?}", config.model))?;
        let adapter = DecoderAdapter::new(decoder, config.latent_dim, 3, config.auxdata);

        let ber_reference = config
            .ber_test
            .as_ref()
            .map(|path| load_f32_file(path))
            .transpose()?;

        Ok(Self {
            bpf,
            fsm,
            adapter,
            write_latent: config.write_latent.is_some().then(Vec::new),
            ber_reference,
            ber_errors: 0,
            ber_bits: 0,
            fmax_target: config.fmax_target,
            fmax_target_reported: false,
        })
    }

    /// Run the read-process-write loop against `input`/`output` until
    /// `input` yields a short read (clean EOF, §5).
    pub fn run<R: Read, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        loop {
            let nin = self.fsm.nin();
            let mut raw = vec![0u8; nin * 8];
            let got = read_fully(&mut input, &mut raw)?;
            if got < raw.len() {
                break;
            }

            let fresh: Vec<Complex> = raw
                .chunks_exact(8)
                .map(|c| {
                    let re = f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64;
                    let im = f32::from_le_bytes([c[4], c[5], c[6], c[7]]) as f64;
                    Complex::new(re, im)
                })
                .collect();

            let filtered = match &mut self.bpf {
                Some(bpf) => fresh.iter().map(|&s| bpf.process_sample(s)).collect(),
                None => fresh,
            };

            let step = self.fsm.step(&filtered)?;
            tracing::debug!(
                state = ?step.state,
                tmax = step.tmax,
                fmax = step.fmax,
                dtmax12 = step.dtmax12,
                "sync step"
            );

            if step.state == RxState::Sync {
                if let (Some(target), false) = (self.fmax_target, self.fmax_target_reported) {
                    tracing::info!(
                        target,
                        achieved = step.fmax,
                        error = step.fmax - target,
                        "acquisition frequency vs target"
                    );
                    self.fmax_target_reported = true;
                }
                if let Some(latents) = step.latents {
                    if let Some(buf) = &mut self.write_latent {
                        buf.extend_from_slice(&latents);
                    }
                    if let Some(reference) = &self.ber_reference {
                        tally_ber(reference, &latents, &mut self.ber_errors, &mut self.ber_bits);
                    }
                    let frame = self.adapter.process(&latents)?;
                    let bytes: Vec<u8> = frame.iter().flat_map(|f| f.to_le_bytes()).collect();
                    output.write_all(&bytes)?;
                }
            } else {
                self.adapter.reset();
            }
        }

        output.flush()?;
        if self.ber_reference.is_some() {
            let ber = if self.ber_bits > 0 {
                self.ber_errors as f64 / self.ber_bits as f64
            } else {
                0.0
            };
            tracing::info!(ber, errors = self.ber_errors, bits = self.ber_bits, "BER test complete");
        }
        Ok(())
    }

    pub fn take_latent_log(&mut self) -> Option<Vec<f32>> {
        self.write_latent.take()
    }
}

fn read_fully<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = input.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

fn load_f32_file(path: &std::path::Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read BER reference file {:?}", path))?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Compare `latents` against the matching slice of `reference` (sign bit
/// per value, i.e. one QPSK bit) and accumulate error/bit counts.
fn tally_ber(reference: &[f32], latents: &[f32], errors: &mut u64, bits: &mut u64) {
    let offset = (*bits as usize).min(reference.len());
    let remaining = reference.len().saturating_sub(offset);
    let n = latents.len().min(remaining);
    for i in 0..n {
        let want = reference[offset + i] > 0.0;
        let got = latents[i] > 0.0;
        if want != got {
            *errors += 1;
        }
        *bits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radae_codec::decoder::VOCODER_LEN;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn config_with_model(model: PathBuf) -> ReceiverConfig {
        ReceiverConfig {
            model,
            latent_dim: 80,
            bottleneck: 3,
            no_bpf: true,
            auxdata: false,
            disable_unsync: None,
            foff_err: None,
            fmax_target: None,
            ber_test: None,
            write_latent: None,
            verbosity: 0,
            config: None,
        }
    }

    fn write_model(dir: &std::path::Path, latent_dim: usize) -> PathBuf {
        let weights = vec![0.0f32; VOCODER_LEN * latent_dim];
        let bias = vec![0.0f32; VOCODER_LEN];
        let mut bytes = Vec::new();
        for w in &weights {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        for b in &bias {
            bytes.extend_from_slice(&b.to_le_bytes());
        }
        let path = dir.join("model.bin");
        std::fs::write(&path, &bytes).unwrap();
        path
    }

    #[test]
    fn test_driver_construction_loads_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path(), 80);
        let config = config_with_model(model);
        let driver = Driver::new(&config);
        assert!(driver.is_ok());
    }

    #[test]
    fn test_run_on_silence_emits_nothing_and_exits_clean() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path(), 80);
        let config = config_with_model(model);
        let mut driver = Driver::new(&config).unwrap();

        let input = Cursor::new(Vec::<u8>::new());
        let mut output = Vec::new();
        driver.run(input, &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_short_read_is_treated_as_clean_eof() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path(), 80);
        let config = config_with_model(model);
        let mut driver = Driver::new(&config).unwrap();

        // fewer bytes than one complex sample: must not error.
        let input = Cursor::new(vec![0u8; 3]);
        let mut output = Vec::new();
        assert!(driver.run(input, &mut output).is_ok());
    }
}
