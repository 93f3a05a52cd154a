//! Command-line surface
//!
//! Every option is an override: unset options keep the preset (or default)
//! value.

use std::path::PathBuf;

use clap::Parser;

use crate::config::SignalKind;

#[derive(Parser, Debug)]
#[command(
    name = "pw-comp",
    version,
    about = "Soft-knee audio compressor",
    long_about = "Soft-knee audio compressor.\n\nRenders a test signal through the compressor \
                  from a dedicated audio thread while the main thread reports meters."
)]
pub struct Cli {
    /// JSON preset to start from
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compression threshold in dB
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f64>,

    /// Compression ratio (4.0 = 4:1)
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Soft knee width in dB
    #[arg(long)]
    pub knee: Option<f64>,

    /// Attack time in milliseconds
    #[arg(long)]
    pub attack: Option<f64>,

    /// Release time in milliseconds
    #[arg(long)]
    pub release: Option<f64>,

    /// Manual makeup gain in dB (0 = auto)
    #[arg(long, allow_hyphen_values = true)]
    pub makeup: Option<f64>,

    /// Automatic makeup gain
    #[arg(long, value_name = "BOOL")]
    pub auto_makeup: Option<bool>,

    /// Pass audio through untouched
    #[arg(long, value_name = "BOOL")]
    pub bypass: Option<bool>,

    /// Number of channels
    #[arg(long)]
    pub channels: Option<usize>,

    /// Sample rate reported by the graph (Hz)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per graph cycle
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Run length in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Test signal
    #[arg(long, value_enum)]
    pub signal: Option<SignalKind>,

    /// Test signal peak level in dBFS
    #[arg(long, allow_hyphen_values = true)]
    pub level: Option<f64>,

    /// Sine frequency in Hz
    #[arg(long)]
    pub frequency: Option<f64>,

    /// Meter report interval in milliseconds
    #[arg(long)]
    pub meter_interval_ms: Option<u64>,

    /// Render as fast as possible instead of in real time
    #[arg(long)]
    pub offline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_means_no_overrides() {
        let cli = Cli::try_parse_from(["pw-comp"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.threshold.is_none());
        assert!(cli.auto_makeup.is_none());
        assert!(cli.bypass.is_none());
        assert!(!cli.offline);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["pw-comp", "--ratio", "four"]).is_err());
        assert!(Cli::try_parse_from(["pw-comp", "--signal", "noise"]).is_err());
        assert!(Cli::try_parse_from(["pw-comp", "--sample-rate", "-1"]).is_err());
        assert!(Cli::try_parse_from(["pw-comp", "--bypass", "maybe"]).is_err());
    }
}
