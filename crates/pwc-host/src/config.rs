//! Host configuration: JSON preset plus command-line overrides

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use pwc_core::{CompressorParams, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, PwcError, PwcResult};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Test signal fed to every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    #[default]
    Sine,
    Dc,
    Step,
    Impulse,
    Silence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub kind: SignalKind,
    /// Peak level in dBFS
    pub level_dbfs: f64,
    /// Sine frequency in Hz
    pub frequency: f64,
    /// Signal length; the rest of the run is silence. `None` = whole run
    pub length_secs: Option<f64>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            kind: SignalKind::Sine,
            level_dbfs: -10.0,
            frequency: 1000.0,
            length_secs: Some(1.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub compressor: CompressorParams,
    pub channels: usize,
    /// Rate the simulated graph reports, Hz
    pub sample_rate: u32,
    /// Frames per graph cycle
    pub block_size: usize,
    pub duration_secs: f64,
    pub signal: SignalConfig,
    pub meter_interval_ms: u64,
    /// Pace the audio thread to wall-clock time
    pub realtime: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            compressor: CompressorParams::default(),
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE as u32,
            block_size: 256,
            duration_secs: 2.0,
            signal: SignalConfig::default(),
            meter_interval_ms: 250,
            realtime: true,
        }
    }
}

impl HostConfig {
    /// Load a JSON preset. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> PwcResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| PwcError::Serialization(e.to_string()))
    }

    /// Preset (if any) with the command-line overrides applied.
    pub fn from_cli(cli: &Cli) -> PwcResult<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                log::info!("Loading preset {}", path.display());
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        let params = &mut self.compressor;
        if let Some(db) = cli.threshold {
            params.threshold_db = db;
        }
        if let Some(ratio) = cli.ratio {
            params.ratio = ratio;
        }
        if let Some(db) = cli.knee {
            params.knee_db = db;
        }
        if let Some(ms) = cli.attack {
            params.attack_ms = ms;
        }
        if let Some(ms) = cli.release {
            params.release_ms = ms;
        }

        // A non-zero manual makeup wins over the auto flag
        match cli.makeup {
            Some(db) if db != 0.0 => {
                params.makeup_gain_db = db;
                params.auto_makeup = false;
            }
            _ => {
                if let Some(auto) = cli.auto_makeup {
                    params.auto_makeup = auto;
                }
            }
        }
        if let Some(bypass) = cli.bypass {
            params.bypass = bypass;
        }

        if let Some(channels) = cli.channels {
            self.channels = channels;
        }
        if let Some(rate) = cli.sample_rate {
            self.sample_rate = rate;
        }
        if let Some(frames) = cli.block_size {
            self.block_size = frames;
        }
        if let Some(secs) = cli.duration {
            self.duration_secs = secs;
        }
        if let Some(kind) = cli.signal {
            self.signal.kind = kind;
        }
        if let Some(db) = cli.level {
            self.signal.level_dbfs = db;
        }
        if let Some(hz) = cli.frequency {
            self.signal.frequency = hz;
        }
        if let Some(ms) = cli.meter_interval_ms {
            self.meter_interval_ms = ms;
        }
        if cli.offline {
            self.realtime = false;
        }
    }

    pub fn validate(&self) -> PwcResult<()> {
        if self.channels == 0 || i32::try_from(self.channels).is_err() {
            return Err(PwcError::InvalidChannelCount(self.channels));
        }
        if self.sample_rate == 0 {
            return Err(PwcError::InvalidSampleRate(0.0));
        }
        if self.block_size == 0 {
            return Err(PwcError::Config("block size must be at least one frame".into()));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(PwcError::Config(format!(
                "duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if !self.signal.level_dbfs.is_finite() {
            return Err(PwcError::InvalidParam(format!(
                "signal level must be finite, got {}",
                self.signal.level_dbfs
            )));
        }
        if self.signal.kind == SignalKind::Sine
            && !(self.signal.frequency.is_finite() && self.signal.frequency > 0.0)
        {
            return Err(PwcError::InvalidParam(format!(
                "sine frequency must be positive, got {}",
                self.signal.frequency
            )));
        }
        if let Some(secs) = self.signal.length_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(PwcError::Config(format!(
                    "signal length must not be negative, got {secs}"
                )));
            }
        }
        Ok(())
    }

    /// Frames rendered over the whole run
    pub fn total_frames(&self) -> usize {
        (self.duration_secs * self.sample_rate as f64).round() as usize
    }

    /// Frames carrying the test signal; silence injection covers the rest
    pub fn signal_frames(&self) -> usize {
        if self.signal.kind == SignalKind::Silence {
            return 0;
        }
        match self.signal.length_secs {
            Some(secs) => {
                let frames = (secs * self.sample_rate as f64).round() as usize;
                frames.min(self.total_frames())
            }
            None => self.total_frames(),
        }
    }
}
