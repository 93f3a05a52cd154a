//! Decibel / linear amplitude conversions on top of the fast math kernel

use crate::fast_math::{fast_log2, fast_pow2};

/// log2(10) / 20: converts dB to log2 amplitude
pub const LOG2_10_DIV_20: f64 = 0.166_096_404_744_368_1;

/// 20 / log2(10): converts log2 amplitude to dB
pub const DB_PER_LOG2: f64 = 6.020_599_913_279_624;

/// Level reported for silence (and for anything that is not a number)
pub const SILENCE_FLOOR_DB: f64 = -144.0;

/// dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    fast_pow2(db * LOG2_10_DIV_20)
}

/// Linear amplitude to dB, floored at [`SILENCE_FLOOR_DB`] for `linear <= 0`
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        return SILENCE_FLOOR_DB;
    }
    fast_log2(linear) * DB_PER_LOG2
}

/// Like [`linear_to_db`], but NaN and infinities also map to the floor.
#[inline]
pub fn linear_to_db_safe(linear: f64) -> f64 {
    if !linear.is_finite() {
        return SILENCE_FLOOR_DB;
    }
    linear_to_db(linear)
}

/// Like [`db_to_linear`], but non-finite input yields silence.
#[inline]
pub fn db_to_linear_safe(db: f64) -> f64 {
    if !db.is_finite() {
        return 0.0;
    }
    db_to_linear(db)
}
