use crate::consts::{EXPONENTIAL_LOWER_BOUND, EXPONENTIAL_UPPER_BOUND, NORMALIZE_SCALE};

/// Whether the default number-to-string form of `x` would switch to
/// exponential notation (`1.2e-7`, `1e21`).
#[inline]
pub fn uses_exponential_notation(x: f64) -> bool {
    if !x.is_finite() || x == 0.0 {
        return false;
    }
    let abs = x.abs();
    abs < EXPONENTIAL_LOWER_BOUND || abs >= EXPONENTIAL_UPPER_BOUND
}

/// Renders `x` as a plain decimal string.
///
/// Values that would be printed with an exponent get exactly
/// `NORMALIZE_SCALE` fractional digits, everything else keeps its
/// shortest round-trip form. Total: zero, negatives, NaN and infinities
/// are rendered as-is.
pub fn normalize(x: f64) -> String {
    if uses_exponential_notation(x) {
        format!("{:.*}", NORMALIZE_SCALE, x)
    } else {
        x.to_string()
    }
}

/// `normalize` followed by a parse back into a number, which is how the
/// arithmetic steps consume the normalized value.
#[inline]
pub fn normalize_value(x: f64) -> f64 {
    normalize(x).parse().unwrap_or(x)
}
