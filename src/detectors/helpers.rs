//! Common helper functions for candlestick pattern detection
//!
//! Default thresholds and the body/shadow comparisons shared by the detector modules.
//! Every comparison is made against the bar's own body or range; there is no lookback
//! averaging.

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Body is doji-like: body <= range * DOJI_RATIO
pub const DOJI_RATIO: f64 = 0.1;
/// Shadow is very long: shadow > body * SHADOW_VERYLONG_FACTOR
pub const SHADOW_VERYLONG_FACTOR: f64 = 2.0;
/// Opposite shadow is short: shadow <= body * SHADOW_SHORT_FACTOR
pub const SHADOW_SHORT_FACTOR: f64 = 0.3;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Check if body is doji-like.
///
/// Requires a strictly positive range, so a zero-range bar and a bar with
/// inverted high/low never qualify.
#[inline]
pub fn is_doji(body: f64, range: f64) -> bool {
    is_doji_f(body, range, DOJI_RATIO)
}

/// Check if shadow is very long (shadow > body * 2).
/// When body=0, threshold is 0, so any positive shadow passes.
#[inline]
pub fn is_shadow_verylong(shadow: f64, body: f64) -> bool {
    is_shadow_verylong_f(shadow, body, SHADOW_VERYLONG_FACTOR)
}

/// Check if shadow is short (shadow <= body * 0.3).
#[inline]
pub fn is_shadow_short(shadow: f64, body: f64) -> bool {
    is_shadow_short_f(shadow, body, SHADOW_SHORT_FACTOR)
}

/// Previous bar bearish, current bullish, current body covers the previous body.
/// Both ends are inclusive.
#[inline]
pub fn engulfs_bullish<T: crate::OHLCVExt>(prev: &T, curr: &T) -> bool {
    prev.is_bearish()
        && curr.is_bullish()
        && curr.open() <= prev.close()
        && curr.close() >= prev.open()
}

/// Previous bar bullish, current bearish, current body covers the previous body.
/// Both ends are inclusive.
#[inline]
pub fn engulfs_bearish<T: crate::OHLCVExt>(prev: &T, curr: &T) -> bool {
    prev.is_bullish()
        && curr.is_bearish()
        && curr.open() >= prev.close()
        && curr.close() <= prev.open()
}

// ============================================================
// FACTOR-PARAMETERIZED VARIANTS
// ============================================================
// These allow detectors to override the default factors.

/// Like [`is_doji`] but with a custom ratio (replaces [`DOJI_RATIO`]).
#[inline]
pub fn is_doji_f(body: f64, range: f64, ratio: f64) -> bool {
    range > 0.0 && body <= range * ratio
}

/// Like [`is_shadow_verylong`] but with a custom factor (replaces [`SHADOW_VERYLONG_FACTOR`]).
#[inline]
pub fn is_shadow_verylong_f(shadow: f64, body: f64, factor: f64) -> bool {
    shadow > body * factor
}

/// Like [`is_shadow_short`] but with a custom factor (replaces [`SHADOW_SHORT_FACTOR`]).
#[inline]
pub fn is_shadow_short_f(shadow: f64, body: f64, factor: f64) -> bool {
    shadow <= body * factor
}
