//! pwc-core: Shared types, parameters and errors for pw-comp
//!
//! This crate provides the foundational types used across the pw-comp crates.
//! It carries no DSP; the signal path lives in `pwc-dsp`.

mod error;
mod params;
mod sample;

pub use error::*;
pub use params::*;
pub use sample::*;

/// Default engine sample rate before the audio graph reports one
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Default channel count (stereo)
pub const DEFAULT_CHANNELS: usize = 2;

/// Channel whose blocks advance the processed-block counter
pub const PRIMARY_CHANNEL: usize = 0;
