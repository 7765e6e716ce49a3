//! radae-rx - receive a RADAE waveform from stdin, emit feature frames on
//! stdout.

use anyhow::Result;
use radae_tools::{Driver, ReceiverConfig};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = ReceiverConfig::load()?;

    let level = match config.verbosity {
        0 => "warn",
        1 => "info,radae_tools=debug,radae_sync=debug",
        _ => "debug,radae_tools=trace,radae_sync=trace,radae_modem=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(io::stderr)
        .init();

    let mut driver = Driver::new(&config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    driver.run(stdin.lock(), stdout.lock())?;

    Ok(())
}
