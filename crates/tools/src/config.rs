//! Receiver configuration: CLI flags (§6) backed by an optional TOML file.
//! CLI flags take precedence over file-supplied defaults.

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `radae-rx` — the RADAE streaming receiver.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "radae-rx")]
#[command(about = "Receive a RADAE neural-speech-over-HF waveform and emit reconstructed vocoder feature frames")]
pub struct ReceiverConfig {
    /// Path to serialized decoder weights.
    pub model: PathBuf,

    /// Latent vector width.
    #[arg(long, default_value_t = 80)]
    pub latent_dim: usize,

    /// Bottleneck mode (1, 2 or 3).
    #[arg(long, default_value_t = 3)]
    pub bottleneck: u8,

    /// Disable the complex band-pass input filter.
    #[arg(long, default_value_t = false)]
    pub no_bpf: bool,

    /// Enable the 21st-feature auxiliary UW bit.
    #[arg(long, default_value_t = false)]
    pub auxdata: bool,

    /// Test-only: suppress unsyncs after this many seconds of sync.
    #[arg(long)]
    pub disable_unsync: Option<f64>,

    /// Test-only: one-shot frequency error (Hz) injected on first sync.
    #[arg(long)]
    pub foff_err: Option<f64>,

    /// Acquisition test target frequency (Hz).
    #[arg(long)]
    pub fmax_target: Option<f64>,

    /// Compare recovered symbols to a known latent file and report BER.
    #[arg(long)]
    pub ber_test: Option<PathBuf>,

    /// Write recovered latents to this file.
    #[arg(long)]
    pub write_latent: Option<PathBuf>,

    /// Stderr verbosity (0, 1 or 2).
    #[arg(short = 'v', long, default_value_t = 0)]
    pub verbosity: u8,

    /// TOML config file supplying defaults for the flags above.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ReceiverConfig {
    /// Parse CLI args, then fold in a `--config` file's values for any
    /// flag not explicitly passed. CLI flags always win.
    pub fn load() -> Result<Self> {
        let cli = Self::parse();
        if let Some(path) = &cli.config {
            let from_file = Self::from_file(path)?;
            return Ok(cli.merge_over(from_file));
        }
        Ok(cli)
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {:?}", path))?;
        toml::from_str(&content).context("failed to parse config file")
    }

    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file: {:?}", path))
    }

    /// Overlay `self` (CLI-parsed, possibly at defaults) onto `base`
    /// (file-supplied): any field at the clap default is replaced by the
    /// file's value. `model` and `config` are always taken from the CLI.
    fn merge_over(self, base: Self) -> Self {
        Self {
            model: self.model,
            latent_dim: if self.latent_dim != 80 { self.latent_dim } else { base.latent_dim },
            bottleneck: if self.bottleneck != 3 { self.bottleneck } else { base.bottleneck },
            no_bpf: self.no_bpf || base.no_bpf,
            auxdata: self.auxdata || base.auxdata,
            disable_unsync: self.disable_unsync.or(base.disable_unsync),
            foff_err: self.foff_err.or(base.foff_err),
            fmax_target: self.fmax_target.or(base.fmax_target),
            ber_test: self.ber_test.or(base.ber_test),
            write_latent: self.write_latent.or(base.write_latent),
            verbosity: if self.verbosity != 0 { self.verbosity } else { base.verbosity },
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_config() -> ReceiverConfig {
        ReceiverConfig {
            model: PathBuf::from("model.bin"),
            latent_dim: 80,
            bottleneck: 3,
            no_bpf: false,
            auxdata: true,
            disable_unsync: None,
            foff_err: None,
            fmax_target: None,
            ber_test: None,
            write_latent: None,
            verbosity: 1,
            config: None,
        }
    }

    #[test]
    fn test_config_roundtrip() {
        let config = sample_config();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to_file(&path).unwrap();
        let loaded = ReceiverConfig::from_file(&path).unwrap();

        assert_eq!(config.bottleneck, loaded.bottleneck);
        assert_eq!(config.auxdata, loaded.auxdata);
        assert_eq!(config.verbosity, loaded.verbosity);
    }

    #[test]
    fn test_merge_prefers_cli_over_file() {
        let mut from_file = sample_config();
        from_file.bottleneck = 1;
        from_file.verbosity = 2;

        let mut from_cli = sample_config();
        from_cli.bottleneck = 3; // at clap default, so file wins
        from_cli.verbosity = 2; // explicitly passed, so CLI wins even though equal

        let merged = from_cli.merge_over(from_file);
        assert_eq!(merged.bottleneck, 1);
        assert_eq!(merged.verbosity, 2);
    }
}
