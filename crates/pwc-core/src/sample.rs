//! Sample types

/// Type alias for audio samples as delivered by the audio graph.
///
/// Blocks travel as 32-bit floats; all envelope and gain math runs in f64.
pub type Sample = f32;

/// Replace NaN and infinities with silence.
#[inline(always)]
pub fn sanitize(sample: Sample) -> Sample {
    if sample.is_finite() { sample } else { 0.0 }
}
