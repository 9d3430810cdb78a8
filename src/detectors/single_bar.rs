//! Single-bar candlestick pattern detectors
//!
//! Patterns: doji, hammer, inverted hammer.
//!
//! Each rule looks at one bar only and compares its shadows against its own body
//! (or its body against its own range).

use super::helpers::{self, is_doji_f, is_shadow_short_f, is_shadow_verylong_f};
use crate::{
    OHLCVExt, PatternDetector, PatternError, PatternMatch, PatternTag, Ratio, Result, OHLCV,
};

impl_with_defaults!(DojiDetector, HammerDetector, InvertedHammerDetector);

/// Shadow factors must be finite and non-negative to give a usable threshold.
pub(crate) fn check_factor(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PatternError::InvalidValue("factor cannot be NaN or infinite"));
    }
    if value < 0.0 {
        return Err(PatternError::InvalidConfig(format!(
            "{field} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

// ============================================================
// DOJI
// ============================================================

/// Doji - body no larger than a tenth of the bar's range
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(helpers::DOJI_RATIO),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &'static str {
        "doji"
    }

    fn tags(&self) -> &'static [PatternTag] {
        &[PatternTag::Doji]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;

        if !is_doji_f(bar.body(), bar.range(), self.max_body_ratio.get()) {
            return None;
        }

        Some(PatternMatch::single(PatternTag::Doji, index))
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Hammer - long lower shadow, little or no upper shadow
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    /// lower shadow must exceed body * this factor
    pub shadow_verylong_factor: f64,
    /// upper shadow must not exceed body * this factor
    pub shadow_short_factor: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_verylong_factor: helpers::SHADOW_VERYLONG_FACTOR,
            shadow_short_factor: helpers::SHADOW_SHORT_FACTOR,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &'static str {
        "hammer"
    }

    fn tags(&self) -> &'static [PatternTag] {
        &[PatternTag::Hammer]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let body = bar.body();

        if !is_shadow_verylong_f(bar.lower_shadow(), body, self.shadow_verylong_factor) {
            return None;
        }
        if !is_shadow_short_f(bar.upper_shadow(), body, self.shadow_short_factor) {
            return None;
        }

        Some(PatternMatch::single(PatternTag::Hammer, index))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("shadow_verylong_factor", self.shadow_verylong_factor)?;
        check_factor("shadow_short_factor", self.shadow_short_factor)
    }
}

/// Inverted Hammer - long upper shadow, little or no lower shadow
#[derive(Debug, Clone, Copy)]
pub struct InvertedHammerDetector {
    /// upper shadow must exceed body * this factor
    pub shadow_verylong_factor: f64,
    /// lower shadow must not exceed body * this factor
    pub shadow_short_factor: f64,
}

impl Default for InvertedHammerDetector {
    fn default() -> Self {
        Self {
            shadow_verylong_factor: helpers::SHADOW_VERYLONG_FACTOR,
            shadow_short_factor: helpers::SHADOW_SHORT_FACTOR,
        }
    }
}

impl PatternDetector for InvertedHammerDetector {
    fn name(&self) -> &'static str {
        "inverted_hammer"
    }

    fn tags(&self) -> &'static [PatternTag] {
        &[PatternTag::InvertedHammer]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let body = bar.body();

        if !is_shadow_verylong_f(bar.upper_shadow(), body, self.shadow_verylong_factor) {
            return None;
        }
        if !is_shadow_short_f(bar.lower_shadow(), body, self.shadow_short_factor) {
            return None;
        }

        Some(PatternMatch::single(PatternTag::InvertedHammer, index))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("shadow_verylong_factor", self.shadow_verylong_factor)?;
        check_factor("shadow_short_factor", self.shadow_short_factor)
    }
}
