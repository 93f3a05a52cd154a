//! Level measurement helpers
//!
//! Exact std math throughout; these are what the fast kernel is checked
//! against.

use pwc_core::{PwcError, PwcResult, Sample};

/// Root mean square, 0 for an empty buffer
pub fn rms(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// Largest absolute sample
pub fn peak(samples: &[Sample]) -> Sample {
    samples.iter().fold(0.0, |acc: Sample, &s| acc.max(s.abs()))
}

/// Linear amplitude to dBFS, `-inf` for `linear <= 0`
#[inline]
pub fn linear_to_dbfs(linear: f64) -> f64 {
    if linear <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * linear.log10()
}

#[inline]
pub fn dbfs_to_linear(dbfs: f64) -> f64 {
    10.0_f64.powf(dbfs / 20.0)
}

/// Input vs output RMS comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainReduction {
    pub input_rms: f64,
    pub output_rms: f64,
    /// Input minus output level in dB; 0 when either side is silent
    pub reduction_db: f64,
}

impl GainReduction {
    pub fn from_rms(input_rms: f64, output_rms: f64) -> Self {
        let reduction_db = if input_rms > 0.0 && output_rms > 0.0 {
            linear_to_dbfs(input_rms) - linear_to_dbfs(output_rms)
        } else {
            0.0
        };
        Self {
            input_rms,
            output_rms,
            reduction_db,
        }
    }
}

pub fn measure_gain_reduction(input: &[Sample], output: &[Sample]) -> PwcResult<GainReduction> {
    if input.len() != output.len() {
        return Err(PwcError::BufferLayout(format!(
            "input has {} samples, output {}",
            input.len(),
            output.len()
        )));
    }

    Ok(GainReduction::from_rms(rms(input), rms(output)))
}

/// [`measure_gain_reduction`] over a stream, one block at a time.
///
/// Keeps running sums only, so memory stays constant however long the
/// stream runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainReductionMeter {
    input_energy: f64,
    output_energy: f64,
    frames: usize,
}

impl GainReductionMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one block. Samples pair up to the shorter of the two slices.
    pub fn push(&mut self, input: &[Sample], output: &[Sample]) {
        for (&i, &o) in input.iter().zip(output) {
            self.input_energy += (i as f64) * (i as f64);
            self.output_energy += (o as f64) * (o as f64);
        }
        self.frames += input.len().min(output.len());
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// `None` until a frame has been pushed
    pub fn result(&self) -> Option<GainReduction> {
        if self.frames == 0 {
            return None;
        }
        let n = self.frames as f64;
        Some(GainReduction::from_rms(
            (self.input_energy / n).sqrt(),
            (self.output_energy / n).sqrt(),
        ))
    }
}
