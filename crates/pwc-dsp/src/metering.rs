//! Lock-free block meters
//!
//! The audio thread publishes one set of levels per channel at the end of
//! every block; any other thread may read them at any time. Fields are
//! individually atomic, so a reader never sees a torn value, but the three
//! fields of one channel may come from different blocks.

use portable_atomic::{AtomicF64, AtomicU64, Ordering};

use crate::units::linear_to_db_safe;

/// Levels observed over the most recent block of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevels {
    /// Largest absolute input sample
    pub input_peak: f64,
    /// Largest absolute output sample
    pub output_peak: f64,
    /// Smallest gain applied (1.0 = no reduction)
    pub min_gain: f64,
}

impl Default for ChannelLevels {
    fn default() -> Self {
        Self {
            input_peak: 0.0,
            output_peak: 0.0,
            min_gain: 1.0,
        }
    }
}

impl ChannelLevels {
    pub fn input_db(&self) -> f64 {
        linear_to_db_safe(self.input_peak)
    }

    pub fn output_db(&self) -> f64 {
        linear_to_db_safe(self.output_peak)
    }

    /// Gain reduction as a positive dB figure
    pub fn gain_reduction_db(&self) -> f64 {
        (-linear_to_db_safe(self.min_gain)).max(0.0)
    }
}

/// Point-in-time copy of every meter
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    pub channels: Vec<ChannelLevels>,
    /// Blocks processed on the primary channel
    pub blocks: u64,
    pub sample_rate: f64,
}

impl MeterSnapshot {
    pub fn channel(&self, channel: usize) -> Option<&ChannelLevels> {
        self.channels.get(channel)
    }

    pub fn left(&self) -> ChannelLevels {
        self.channels.first().copied().unwrap_or_default()
    }

    pub fn right(&self) -> ChannelLevels {
        self.channels.get(1).copied().unwrap_or_default()
    }
}

/// Atomic storage for one channel's levels
#[derive(Debug)]
struct ChannelMeter {
    input_peak: AtomicF64,
    output_peak: AtomicF64,
    min_gain: AtomicF64,
}

impl ChannelMeter {
    fn new() -> Self {
        let levels = ChannelLevels::default();
        Self {
            input_peak: AtomicF64::new(levels.input_peak),
            output_peak: AtomicF64::new(levels.output_peak),
            min_gain: AtomicF64::new(levels.min_gain),
        }
    }

    fn store(&self, levels: ChannelLevels) {
        self.input_peak.store(levels.input_peak, Ordering::Relaxed);
        self.output_peak.store(levels.output_peak, Ordering::Relaxed);
        self.min_gain.store(levels.min_gain, Ordering::Relaxed);
    }

    fn load(&self) -> ChannelLevels {
        ChannelLevels {
            input_peak: self.input_peak.load(Ordering::Relaxed),
            output_peak: self.output_peak.load(Ordering::Relaxed),
            min_gain: self.min_gain.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        self.store(ChannelLevels::default());
    }
}

/// Meters for a fixed number of channels plus the block counter.
///
/// Allocated once; publishing never allocates.
#[derive(Debug)]
pub struct MeterBank {
    channels: Box<[ChannelMeter]>,
    blocks: AtomicU64,
}

impl MeterBank {
    pub fn new(channels: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| ChannelMeter::new()).collect(),
            blocks: AtomicU64::new(0),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Publish the levels of a finished block. Out-of-range channels are ignored.
    #[inline]
    pub fn publish(&self, channel: usize, levels: ChannelLevels) {
        if let Some(meter) = self.channels.get(channel) {
            meter.store(levels);
        }
    }

    #[inline]
    pub fn count_block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn levels(&self, channel: usize) -> Option<ChannelLevels> {
        self.channels.get(channel).map(ChannelMeter::load)
    }

    pub fn snapshot(&self, sample_rate: f64) -> MeterSnapshot {
        MeterSnapshot {
            channels: self.channels.iter().map(ChannelMeter::load).collect(),
            blocks: self.blocks(),
            sample_rate,
        }
    }

    /// Back to the initial state: silent peaks, unity gain, zero blocks
    pub fn clear(&self) {
        for meter in self.channels.iter() {
            meter.clear();
        }
        self.blocks.store(0, Ordering::Relaxed);
    }
}
