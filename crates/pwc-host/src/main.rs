//! pw-comp - Soft-knee compressor host
//!
//! Usage:
//!   pw-comp                              - 2 s of -10 dBFS sine, real time
//!   pw-comp --offline --threshold -30    - render as fast as possible
//!   pw-comp -c preset.json --signal step - start from a JSON preset

mod cli;
mod config;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use crate::cli::Cli;
use crate::config::HostConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = HostConfig::from_cli(&cli).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let params = config.compressor.clamped();
    log::info!("Starting pw-comp...");
    log::info!(
        "Compressor: threshold {:.1} dB, ratio {:.1}:1, knee {:.1} dB, attack {:.1} ms, release {:.1} ms, makeup {}",
        params.threshold_db,
        params.ratio,
        params.knee_db,
        params.attack_ms,
        params.release_ms,
        if params.auto_makeup {
            format!("auto ({:.1} dB)", params.auto_makeup_db())
        } else {
            format!("{:.1} dB", params.makeup_gain_db)
        }
    );

    let summary = render::run(&config)?;
    log::info!(
        "Rendered {} frames on {} channel(s)",
        summary.frames,
        summary.meters.channels.len()
    );

    Ok(())
}
