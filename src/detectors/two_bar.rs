//! Two-bar candlestick pattern detectors
//!
//! Patterns: bullish engulfing, bearish engulfing.

#![allow(clippy::default_constructed_unit_structs)]

use super::helpers::{engulfs_bearish, engulfs_bullish};
use crate::{PatternDetector, PatternMatch, PatternTag, OHLCV};

impl_with_defaults!(EngulfingDetector);

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Engulfing Pattern (bullish and bearish)
///
/// The current body must cover the previous body, with the two bars of
/// opposite colour. Equal ends count as covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn name(&self) -> &'static str {
        "engulfing"
    }

    fn tags(&self) -> &'static [PatternTag] {
        &[PatternTag::BullishEngulfing, PatternTag::BearishEngulfing]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if engulfs_bullish(prev, curr) {
            return Some(PatternMatch::spanning(
                PatternTag::BullishEngulfing,
                index - 1,
                index,
            ));
        }

        if engulfs_bearish(prev, curr) {
            return Some(PatternMatch::spanning(
                PatternTag::BearishEngulfing,
                index - 1,
                index,
            ));
        }

        None
    }
}
