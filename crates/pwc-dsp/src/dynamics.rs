//! Soft-knee peak compressor
//!
//! Feed-forward, per-channel, peak-detecting compressor:
//! - asymmetric one-pole envelope follower (attack / release)
//! - log2-domain soft-knee gain curve blended by ratio
//! - static or automatic makeup gain
//!
//! The engine itself is not synchronised; see [`crate::shared`] for the
//! locked wrapper the audio thread and control threads share.

use std::f64::consts::LN_2;

use pwc_core::{CompressorParams, PwcError, PwcResult, Sample};

use crate::fast_math::{fast_log2, fast_pow2, fast_sqrt};
use crate::units::{LOG2_10_DIV_20, db_to_linear, db_to_linear_safe};
use crate::{Processor, ProcessorConfig};

/// Coefficients derived from [`CompressorParams`] and the sample rate.
///
/// Only ever written through the two commit paths below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorCoeffs {
    pub threshold_linear: f64,
    /// Squared knee width in log2 domain
    pub knee_factor: f64,
    pub attack_factor: f64,
    pub release_factor: f64,
    pub makeup_gain_linear: f64,
}

impl Default for CompressorCoeffs {
    /// Placeholder values until the first commit
    fn default() -> Self {
        Self {
            threshold_linear: 1.0,
            knee_factor: 0.0,
            attack_factor: 0.5,
            release_factor: 0.5,
            makeup_gain_linear: 1.0,
        }
    }
}

impl CompressorCoeffs {
    pub fn new(params: &CompressorParams, sample_rate: f64) -> Self {
        let mut coeffs = Self::default();
        coeffs.commit_levels(params, sample_rate);
        coeffs
    }

    /// Full recompute: threshold, knee, makeup and both time constants.
    pub fn commit_levels(&mut self, params: &CompressorParams, sample_rate: f64) {
        self.threshold_linear = db_to_linear_safe(params.threshold_db);
        self.knee_factor = knee_factor(params.knee_db);
        self.makeup_gain_linear = db_to_linear(params.makeup_gain_db);
        self.commit_times(params, sample_rate);
    }

    /// Attack / release pair only.
    pub fn commit_times(&mut self, params: &CompressorParams, sample_rate: f64) {
        self.attack_factor = attack_factor(params.attack_ms, sample_rate);
        self.release_factor = release_factor(params.release_ms, sample_rate);
    }
}

/// (2 * log2(10)/20 * knee_db)^2
#[inline]
pub fn knee_factor(knee_db: f64) -> f64 {
    let knee_log2 = 2.0 * LOG2_10_DIV_20 * knee_db;
    knee_log2 * knee_log2
}

/// One-pole rise coefficient: the envelope covers half the distance to a
/// louder input in `attack_ms`.
#[inline]
pub fn attack_factor(attack_ms: f64, sample_rate: f64) -> f64 {
    open_unit(1.0 - (-LN_2 / (attack_ms * 0.001 * sample_rate)).exp())
}

/// One-pole fall coefficient: half-life of `release_ms`.
#[inline]
pub fn release_factor(release_ms: f64, sample_rate: f64) -> f64 {
    open_unit((-LN_2 / (release_ms * 0.001 * sample_rate)).exp())
}

/// Keep a filter coefficient strictly inside (0, 1).
///
/// Extreme time/rate products round to exactly 0 or 1 in f64, which would
/// freeze or bypass the envelope.
#[inline]
fn open_unit(x: f64) -> f64 {
    if x.is_nan() {
        return f64::EPSILON;
    }
    x.clamp(f64::EPSILON, 1.0 - f64::EPSILON)
}

/// Soft-knee compressor engine
#[derive(Debug, Clone)]
pub struct SoftKneeCompressor {
    params: CompressorParams,
    coeffs: CompressorCoeffs,
    // Envelope per channel
    peak: Vec<f64>,
    sample_rate: f64,
    channels: usize,
}

impl SoftKneeCompressor {
    /// Engine with default parameters.
    ///
    /// Fails for a non-finite or non-positive sample rate, or zero channels.
    pub fn new(sample_rate: f64, channels: usize) -> PwcResult<Self> {
        Self::with_params(sample_rate, channels, CompressorParams::default())
    }

    pub fn with_params(
        sample_rate: f64,
        channels: usize,
        params: CompressorParams,
    ) -> PwcResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(PwcError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(PwcError::InvalidChannelCount(channels));
        }

        let params = params.clamped();
        let mut comp = Self {
            params,
            coeffs: CompressorCoeffs::default(),
            peak: vec![0.0; channels],
            sample_rate,
            channels,
        };
        comp.commit_levels();

        log::info!(
            "Compressor ready: {} Hz, {} channel(s), threshold {:.1} dB, ratio {:.2}:1",
            sample_rate,
            channels,
            comp.params.threshold_db,
            comp.params.ratio
        );
        Ok(comp)
    }

    // Commit paths

    /// Recompute every coefficient, deriving makeup first when automatic.
    fn commit_levels(&mut self) {
        if self.params.auto_makeup {
            self.params.makeup_gain_db = self.params.auto_makeup_db();
        }
        self.coeffs.commit_levels(&self.params, self.sample_rate);
    }

    fn commit_times(&mut self) {
        self.coeffs.commit_times(&self.params, self.sample_rate);
    }

    // Parameter setters
    //
    // Silent: callers may hold a lock the audio thread waits on.

    /// Non-finite values are ignored.
    pub fn set_threshold(&mut self, db: f64) {
        if !db.is_finite() {
            return;
        }
        self.params.threshold_db = db;
        self.commit_levels();
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.params.ratio = CompressorParams::clamp_ratio(ratio);
        self.commit_levels();
    }

    pub fn set_knee(&mut self, db: f64) {
        self.params.knee_db = CompressorParams::clamp_knee(db);
        self.commit_levels();
    }

    pub fn set_attack(&mut self, ms: f64) {
        self.params.attack_ms = CompressorParams::clamp_attack(ms);
        self.commit_times();
    }

    pub fn set_release(&mut self, ms: f64) {
        self.params.release_ms = CompressorParams::clamp_release(ms);
        self.commit_times();
    }

    /// Manual makeup gain. Turns auto makeup off; non-finite values are ignored.
    pub fn set_makeup_gain(&mut self, db: f64) {
        if !db.is_finite() {
            return;
        }
        self.params.makeup_gain_db = db;
        self.params.auto_makeup = false;
        self.commit_levels();
    }

    pub fn set_auto_makeup(&mut self, enable: bool) {
        self.params.auto_makeup = enable;
        self.commit_levels();
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.params.bypass = bypass;
    }

    /// Replace the whole parameter set with one full recompute.
    pub fn apply_params(&mut self, params: &CompressorParams) {
        self.params = params.clamped();
        self.commit_levels();
    }

    /// Follow a new sample rate, recomputing the time constants.
    ///
    /// Returns `false` (and changes nothing) when the rate is non-finite,
    /// non-positive or unchanged.
    pub fn update_sample_rate(&mut self, sample_rate: f64) -> bool {
        if !(sample_rate.is_finite() && sample_rate > 0.0) || sample_rate == self.sample_rate {
            return false;
        }
        self.sample_rate = sample_rate;
        self.commit_times();
        true
    }

    // Getters

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    pub fn coeffs(&self) -> &CompressorCoeffs {
        &self.coeffs
    }

    pub fn threshold(&self) -> f64 {
        self.params.threshold_db
    }

    pub fn ratio(&self) -> f64 {
        self.params.ratio
    }

    pub fn knee(&self) -> f64 {
        self.params.knee_db
    }

    pub fn attack(&self) -> f64 {
        self.params.attack_ms
    }

    pub fn release(&self) -> f64 {
        self.params.release_ms
    }

    /// Effective makeup gain in dB (derived value when auto makeup is on)
    pub fn makeup_gain(&self) -> f64 {
        self.params.makeup_gain_db
    }

    pub fn auto_makeup(&self) -> bool {
        self.params.auto_makeup
    }

    pub fn bypass(&self) -> bool {
        self.params.bypass
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Envelope level of `channel`, `None` when out of range
    pub fn peak(&self, channel: usize) -> Option<f64> {
        self.peak.get(channel).copied()
    }

    /// Map a caller-supplied channel index to a slot, if it names one.
    #[inline]
    pub fn channel_slot(&self, channel: i32) -> Option<usize> {
        usize::try_from(channel).ok().filter(|&ch| ch < self.channels)
    }

    // Processing

    /// Process one sample, returning the output and the applied gain.
    ///
    /// Bypass and out-of-range channels pass the sample through with gain 1.
    #[inline]
    pub fn process_sample(&mut self, sample: Sample, channel: i32) -> (Sample, f64) {
        if self.params.bypass {
            return (sample, 1.0);
        }
        let Some(ch) = self.channel_slot(channel) else {
            return (sample, 1.0);
        };

        let mut input_level = (sample as f64).abs();
        if !input_level.is_finite() {
            input_level = 0.0;
        }

        let peak = &mut self.peak[ch];
        if input_level > *peak {
            *peak += (input_level - *peak) * self.coeffs.attack_factor;
        } else {
            *peak = input_level + (*peak - input_level) * self.coeffs.release_factor;
        }
        if !peak.is_finite() {
            *peak = 0.0;
        }

        let level = *peak;
        let mut gain = self.calculate_gain(level);
        if !gain.is_finite() {
            gain = 1.0;
        }

        let output = (sample as f64 * gain * self.coeffs.makeup_gain_linear) as Sample;
        (output, gain)
    }

    /// Static gain curve: envelope level to gain multiplier in (0, 1].
    #[inline]
    pub fn calculate_gain(&self, peak_level: f64) -> f64 {
        if peak_level <= 0.0 {
            return 1.0;
        }

        let threshold_log2 = self.params.threshold_db * LOG2_10_DIV_20;
        let delta = threshold_log2 - fast_log2(peak_level);

        // Below threshold: untouched, whatever the knee
        if delta > 0.0 {
            return 1.0;
        }

        let knee = 0.5 * (delta - fast_sqrt(delta * delta + self.coeffs.knee_factor));
        fast_pow2(knee * (1.0 - 1.0 / self.params.ratio))
    }
}

impl Processor for SoftKneeCompressor {
    fn reset(&mut self) {
        self.peak.fill(0.0);
    }
}

impl ProcessorConfig for SoftKneeCompressor {
    /// Ignored when non-positive, non-finite or unchanged.
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.update_sample_rate(sample_rate);
    }
}
