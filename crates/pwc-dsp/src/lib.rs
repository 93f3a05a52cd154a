//! pwc-dsp: Signal path for pw-comp
//!
//! Real-time soft-knee compression with lock-free metering.
//!
//! ## Modules
//! - `fast_math` - Approximate log2, 2^x and sqrt for the per-sample path
//! - `units` - dB / linear conversions on top of `fast_math`
//! - `dynamics` - Soft-knee peak compressor engine and its coefficients
//! - `metering` - Atomic per-channel block meters
//! - `shared` - Locked, thread-shared compressor for audio + control threads
//! - `signals` - Test signal generators
//! - `analysis` - RMS / peak / gain reduction measurement

pub mod analysis;
pub mod dynamics;
pub mod fast_math;
pub mod metering;
pub mod shared;
pub mod signals;
pub mod units;

pub use dynamics::{CompressorCoeffs, SoftKneeCompressor};
pub use metering::{ChannelLevels, MeterBank, MeterSnapshot};
pub use shared::SharedCompressor;

/// Trait for all DSP processors
pub trait Processor: Send + Sync {
    /// Reset processor state
    fn reset(&mut self);

    /// Get latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Processor configuration for sample rate changes
pub trait ProcessorConfig {
    fn set_sample_rate(&mut self, sample_rate: f64);
}
