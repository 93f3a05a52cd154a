//! Fast math kernel: approximate log2, 2^x and sqrt
//!
//! Audio-rate replacements for the std transcendental functions. All three
//! are pure, allocation-free and never panic. Accuracy (measured over the
//! full normal range):
//! - `fast_log2`: absolute error below 1.5e-4, continuous and monotonic
//! - `fast_pow2`: relative error below 1.7e-4, continuous across integer
//!   boundaries
//! - `fast_sqrt`: relative error below 2e-6
//!
//! The gain curve only ever needs these to be smooth and monotonic; exact
//! values come from std where measurements are taken.

/// log2(frac) + 1 for frac in [0.5, 1), degree-4 least-squares fit, Horner order.
///
/// Constrained so that p(1) == p(0.5) + 1 (no jump between octaves).
const LOG2_POLY: [f64; 5] = [
    -1.266_404_672_985_274,
    5.050_302_923_362_236,
    -8.368_743_308_553_979,
    8.089_593_608_794_445,
    -2.504_721_003_417_105_7,
];

/// 2^r - 1 = r * (c0 + r * (c1 + r * c2)) for r in [-0.5, 0.5].
///
/// Constrained so that p(0.5) == 2 * p(-0.5).
const POW2_POLY: [f64; 3] = [
    0.693_301_430_238_249_5,
    0.241_931_554_073_241_63,
    0.054_748_648_429_162_55,
];

const EXP_MASK: u64 = 0x7ff << 52;
const EXP_BIAS: i64 = 1023;
/// 2^54, lifts subnormals into the normal range
const SUBNORMAL_SCALE: f64 = 18_014_398_509_481_984.0;

/// Decompose positive finite `x` into `frac * 2^exp` with `frac` in [0.5, 1).
#[inline(always)]
fn frexp(x: f64) -> (f64, i32) {
    let (x, shift) = if x.to_bits() & EXP_MASK == 0 {
        (x * SUBNORMAL_SCALE, 54)
    } else {
        (x, 0)
    };

    let bits = x.to_bits();
    let biased = ((bits & EXP_MASK) >> 52) as i32;
    let frac = f64::from_bits((bits & !EXP_MASK) | (1022u64 << 52));
    (frac, biased - 1022 - shift)
}

/// Approximate base-2 logarithm.
///
/// Returns `-inf` for `x <= 0`. NaN and `+inf` pass through.
#[inline]
pub fn fast_log2(x: f64) -> f64 {
    if x <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if !x.is_finite() {
        return x;
    }

    let (frac, exp) = frexp(x);

    let mut poly = LOG2_POLY[0];
    for &c in &LOG2_POLY[1..] {
        poly = poly * frac + c;
    }

    (exp - 1) as f64 + poly
}

/// Approximate 2^x.
///
/// The integer part is built directly in the exponent field; only the
/// fractional remainder goes through the polynomial.
#[inline]
pub fn fast_pow2(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }

    let n = x.round();
    if n > EXP_BIAS as f64 {
        return f64::INFINITY;
    }
    if n < (1 - EXP_BIAS) as f64 {
        return 0.0;
    }

    let r = x - n;
    let poly = 1.0 + r * (POW2_POLY[0] + r * (POW2_POLY[1] + r * POW2_POLY[2]));
    let scale = f64::from_bits(((n as i64 + EXP_BIAS) as u64) << 52);

    poly * scale
}

/// Approximate square root.
///
/// Halves the biased exponent for a first guess, then two Newton-Raphson
/// steps. Returns 0 for `x <= 0`.
#[inline]
pub fn fast_sqrt(x: f64) -> f64 {
    if x <= 0.0 || x.is_nan() {
        return 0.0;
    }
    if x.is_infinite() {
        return x;
    }

    let mut r = f64::from_bits((x.to_bits() >> 1) + ((EXP_BIAS as u64) << 51));
    r = 0.5 * (r + x / r);
    0.5 * (r + x / r)
}
