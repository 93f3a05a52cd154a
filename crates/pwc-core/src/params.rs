//! Parameter types for the compressor

use serde::{Deserialize, Serialize};

/// Lowest accepted ratio (1:1, no compression)
pub const MIN_RATIO: f64 = 1.0;
/// Narrowest knee (hard knee)
pub const MIN_KNEE_DB: f64 = 0.0;
/// Fastest attack in milliseconds
pub const MIN_ATTACK_MS: f64 = 0.1;
/// Fastest release in milliseconds
pub const MIN_RELEASE_MS: f64 = 1.0;
/// Default compression threshold in dBFS
pub const DEFAULT_THRESHOLD_DB: f64 = -20.0;

/// User-facing compressor parameters.
///
/// Out-of-range values are clamped, never rejected, so a slider or a live
/// CLI flag can not break the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Level above which gain reduction begins (dBFS)
    pub threshold_db: f64,
    /// Compression slope (1.0 = off, large = limiting)
    pub ratio: f64,
    /// Width of the soft transition around the threshold (dB)
    pub knee_db: f64,
    /// Envelope rise time (ms)
    pub attack_ms: f64,
    /// Envelope fall time (ms)
    pub release_ms: f64,
    /// Static output gain (dB); derived when `auto_makeup` is set
    pub makeup_gain_db: f64,
    /// Derive makeup gain from threshold and ratio
    pub auto_makeup: bool,
    /// Pass audio through untouched
    pub bypass: bool,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            ratio: 4.0,
            knee_db: 6.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_gain_db: 0.0,
            auto_makeup: true,
            bypass: false,
        }
    }
}

impl CompressorParams {
    #[inline]
    pub fn clamp_ratio(ratio: f64) -> f64 {
        ratio.max(MIN_RATIO)
    }

    #[inline]
    pub fn clamp_knee(knee_db: f64) -> f64 {
        knee_db.max(MIN_KNEE_DB)
    }

    #[inline]
    pub fn clamp_attack(attack_ms: f64) -> f64 {
        attack_ms.max(MIN_ATTACK_MS)
    }

    #[inline]
    pub fn clamp_release(release_ms: f64) -> f64 {
        release_ms.max(MIN_RELEASE_MS)
    }

    /// Copy with every constrained field pulled into its valid range.
    ///
    /// A non-finite threshold or makeup gain falls back to its default.
    pub fn clamped(self) -> Self {
        Self {
            threshold_db: finite_or(self.threshold_db, DEFAULT_THRESHOLD_DB),
            makeup_gain_db: finite_or(self.makeup_gain_db, 0.0),
            ratio: Self::clamp_ratio(self.ratio),
            knee_db: Self::clamp_knee(self.knee_db),
            attack_ms: Self::clamp_attack(self.attack_ms),
            release_ms: Self::clamp_release(self.release_ms),
            ..self
        }
    }

    /// Makeup gain that puts an at-threshold signal back at unity
    #[inline]
    pub fn auto_makeup_db(&self) -> f64 {
        -self.threshold_db * (1.0 - 1.0 / self.ratio)
    }
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = CompressorParams::default();
        assert_eq!(params.threshold_db, -20.0);
        assert_eq!(params.ratio, 4.0);
        assert_eq!(params.knee_db, 6.0);
        assert_eq!(params.attack_ms, 10.0);
        assert_eq!(params.release_ms, 100.0);
        assert_eq!(params.makeup_gain_db, 0.0);
        assert!(params.auto_makeup);
        assert!(!params.bypass);
    }

    #[test]
    fn test_clamped() {
        let params = CompressorParams {
            threshold_db: -80.0,
            ratio: 0.5,
            knee_db: -3.0,
            attack_ms: 0.0,
            release_ms: 0.2,
            ..Default::default()
        }
        .clamped();

        assert_eq!(params.threshold_db, -80.0);
        assert_eq!(params.ratio, MIN_RATIO);
        assert_eq!(params.knee_db, MIN_KNEE_DB);
        assert_eq!(params.attack_ms, MIN_ATTACK_MS);
        assert_eq!(params.release_ms, MIN_RELEASE_MS);
    }

    #[test]
    fn test_nan_ratio_clamps_to_unity() {
        assert_eq!(CompressorParams::clamp_ratio(f64::NAN), MIN_RATIO);
    }

    #[test]
    fn test_clamped_replaces_non_finite_levels() {
        let params = CompressorParams {
            threshold_db: f64::NAN,
            makeup_gain_db: f64::INFINITY,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.threshold_db, DEFAULT_THRESHOLD_DB);
        assert_eq!(params.makeup_gain_db, 0.0);

        let params = CompressorParams {
            threshold_db: f64::NEG_INFINITY,
            makeup_gain_db: f64::NAN,
            ..Default::default()
        }
        .clamped();
        assert!(params.threshold_db.is_finite());
        assert!(params.makeup_gain_db.is_finite());
    }

    #[test]
    fn test_auto_makeup_db() {
        let params = CompressorParams::default();
        assert!((params.auto_makeup_db() - 15.0).abs() < 1e-12);

        let unity = CompressorParams {
            ratio: 1.0,
            ..Default::default()
        };
        assert_eq!(unity.auto_makeup_db(), 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: CompressorParams =
            serde_json::from_str(r#"{ "threshold_db": -12.0, "bypass": true }"#).unwrap();
        assert_eq!(params.threshold_db, -12.0);
        assert!(params.bypass);
        assert_eq!(params.ratio, 4.0);
        assert!(params.auto_makeup);
    }
}
