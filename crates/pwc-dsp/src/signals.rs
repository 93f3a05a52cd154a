//! Test signal generators

use std::f64::consts::PI;

use pwc_core::{PwcError, PwcResult, Sample};

/// Sine wave settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineConfig {
    /// Hz
    pub frequency: f64,
    /// Linear peak amplitude
    pub amplitude: f64,
    /// Radians
    pub phase: f64,
    /// Hz
    pub sample_rate: f64,
}

impl Default for SineConfig {
    fn default() -> Self {
        Self {
            frequency: 1000.0,
            amplitude: 1.0,
            phase: 0.0,
            sample_rate: 48000.0,
        }
    }
}

impl SineConfig {
    #[inline]
    fn omega(&self) -> f64 {
        2.0 * PI * self.frequency / self.sample_rate
    }

    /// Sample `index` of the wave, with an extra phase offset
    #[inline]
    pub fn sample_at(&self, index: usize, offset: f64) -> Sample {
        (self.amplitude * (self.omega() * index as f64 + self.phase + offset).sin()) as Sample
    }
}

/// Mono sine of `frames` samples
pub fn generate_sine(config: &SineConfig, frames: usize) -> Vec<Sample> {
    (0..frames).map(|i| config.sample_at(i, 0.0)).collect()
}

/// Interleaved L/R sine; the right channel leads by `right_phase` radians
pub fn generate_stereo_sine(config: &SineConfig, frames: usize, right_phase: f64) -> Vec<Sample> {
    (0..frames)
        .flat_map(|i| [config.sample_at(i, 0.0), config.sample_at(i, right_phase)])
        .collect()
}

/// Constant level
pub fn generate_dc(level: f64, len: usize) -> Vec<Sample> {
    vec![level as Sample; len]
}

/// Zero until `start`, `amplitude` from there on
pub fn generate_step(amplitude: f64, start: usize, len: usize) -> Vec<Sample> {
    (0..len)
        .map(|i| if i >= start { amplitude as Sample } else { 0.0 })
        .collect()
}

/// Single non-zero sample at `position` (all zero if past the end)
pub fn generate_impulse(amplitude: f64, position: usize, len: usize) -> Vec<Sample> {
    let mut buf = vec![0.0; len];
    if let Some(s) = buf.get_mut(position) {
        *s = amplitude as Sample;
    }
    buf
}

/// Two mono buffers to one interleaved stereo buffer
pub fn interleave(left: &[Sample], right: &[Sample]) -> PwcResult<Vec<Sample>> {
    if left.len() != right.len() {
        return Err(PwcError::BufferLayout(format!(
            "channel lengths differ: {} vs {}",
            left.len(),
            right.len()
        )));
    }

    Ok(left
        .iter()
        .zip(right)
        .flat_map(|(&l, &r)| [l, r])
        .collect())
}

/// Interleaved stereo buffer to (left, right)
pub fn deinterleave(interleaved: &[Sample]) -> PwcResult<(Vec<Sample>, Vec<Sample>)> {
    if interleaved.len() % 2 != 0 {
        return Err(PwcError::BufferLayout(format!(
            "interleaved stereo buffer has odd length {}",
            interleaved.len()
        )));
    }

    Ok(interleaved
        .chunks_exact(2)
        .map(|frame| (frame[0], frame[1]))
        .unzip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_amplitude() {
        let config = SineConfig {
            frequency: 440.0,
            amplitude: 0.5,
            ..Default::default()
        };
        let buf = generate_sine(&config, 48000);
        let max = buf.iter().fold(0.0_f32, |a, &b| a.max(b.abs()));
        assert!((max - 0.5).abs() < 0.01);
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn test_stereo_phase_offset() {
        let config = SineConfig::default();
        let buf = generate_stereo_sine(&config, 64, PI / 2.0);
        assert_eq!(buf.len(), 128);
        assert_eq!(buf[0], 0.0);
        assert!((buf[1] - 1.0).abs() < 1e-6);

        let (left, _) = deinterleave(&buf).unwrap();
        assert_eq!(left, generate_sine(&config, 64));
    }

    #[test]
    fn test_step_and_impulse() {
        let step = generate_step(0.8, 3, 6);
        assert_eq!(step, vec![0.0, 0.0, 0.0, 0.8, 0.8, 0.8]);

        let impulse = generate_impulse(1.0, 2, 4);
        assert_eq!(impulse, vec![0.0, 0.0, 1.0, 0.0]);
        assert!(generate_impulse(1.0, 9, 4).iter().all(|&s| s == 0.0));

        assert_eq!(generate_dc(0.25, 3), vec![0.25; 3]);
    }

    #[test]
    fn test_interleave_round_trip() {
        let left = vec![1.0, 2.0, 3.0];
        let right = vec![-1.0, -2.0, -3.0];
        let stereo = interleave(&left, &right).unwrap();
        assert_eq!(stereo, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(deinterleave(&stereo).unwrap(), (left, right));
    }

    #[test]
    fn test_layout_errors() {
        assert!(matches!(
            interleave(&[1.0], &[1.0, 2.0]),
            Err(PwcError::BufferLayout(_))
        ));
        assert!(matches!(
            deinterleave(&[1.0, 2.0, 3.0]),
            Err(PwcError::BufferLayout(_))
        ));
    }
}
