//! # candlescope - candlestick pattern annotation
//!
//! Labels daily price bars with simple candlestick patterns: doji, hammer,
//! inverted hammer, bullish engulfing and bearish engulfing.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlescope::prelude::*;
//!
//! // Bring your own bar type...
//! struct Quote { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLCV for Quote {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! // ...and label it with the default rules
//! let quotes = vec![Quote { o: 10.0, h: 10.1, l: 9.9, c: 10.01 }];
//! let patterns = detect(&quotes);
//! assert_eq!(patterns.get(0), Some(PatternTag::Doji));
//!
//! // Or build an engine with a custom detector set
//! let engine = EngineBuilder::new()
//!     .with_single_bar_defaults()
//!     .validate_data(true)
//!     .build()
//!     .unwrap();
//! let patterns = engine.scan(&quotes).unwrap();
//! assert_eq!(patterns.len(), 1);
//! ```

pub mod detectors;
pub mod generator;
pub mod params;
pub mod render;

pub mod prelude {
    pub use crate::{
        // Entry point
        detect,
        // Detectors
        detectors::*,
        // Generator
        generator::{generate_random_candles, CandleGenerator},
        // Parameters
        params::{get_factor, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Render model
        render::{CandleStyle, PatternFilter, Selection, Tooltip},
        // Parallel
        scan_parallel,
        // Types
        Bar,
        // Iterator
        BarPattern,
        // Engine
        BuiltinDetector,
        Direction,
        EngineBuilder,
        OHLCVExt,
        PatternCounts,
        // Core traits
        PatternDetector,
        PatternEngine,
        // Errors
        PatternError,
        PatternIterator,
        PatternMap,
        PatternMatch,
        PatternTag,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        OHLCV,
    };
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur while configuring or running detection
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Unknown pattern: {0:?}")]
    UnknownPattern(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLC data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate OHLC data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.low() > self.open().min(self.close()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "low above body",
            });
        }
        if self.high() < self.open().max(self.close()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "high below body",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// A daily price bar
///
/// `time` is an ordinal used for ordering only; detection never reads it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    #[serde(default)]
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub const fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.time)
    }
}

// ============================================================
// PATTERN TAGS
// ============================================================

/// The closed set of pattern labels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum PatternTag {
    Doji,
    Hammer,
    InvertedHammer,
    BullishEngulfing,
    BearishEngulfing,
}

impl PatternTag {
    /// All tags in rule precedence order
    pub const ALL: [PatternTag; 5] = [
        PatternTag::Doji,
        PatternTag::Hammer,
        PatternTag::InvertedHammer,
        PatternTag::BullishEngulfing,
        PatternTag::BearishEngulfing,
    ];

    /// Wire identifier, e.g. `"invertedHammer"`
    pub fn as_str(self) -> &'static str {
        match self {
            PatternTag::Doji => "doji",
            PatternTag::Hammer => "hammer",
            PatternTag::InvertedHammer => "invertedHammer",
            PatternTag::BullishEngulfing => "bullishEngulfing",
            PatternTag::BearishEngulfing => "bearishEngulfing",
        }
    }

    /// Human-readable name, e.g. `"Inverted Hammer"`
    pub const fn display_name(self) -> &'static str {
        match self {
            PatternTag::Doji => "Doji",
            PatternTag::Hammer => "Hammer",
            PatternTag::InvertedHammer => "Inverted Hammer",
            PatternTag::BullishEngulfing => "Bullish Engulfing",
            PatternTag::BearishEngulfing => "Bearish Engulfing",
        }
    }

    /// Abbreviated name used in the counts summary
    pub fn short_name(self) -> &'static str {
        match self {
            PatternTag::Doji => "Doji",
            PatternTag::Hammer => "Hammer",
            PatternTag::InvertedHammer => "Inverted",
            PatternTag::BullishEngulfing => "Bull Engulf",
            PatternTag::BearishEngulfing => "Bear Engulf",
        }
    }

    /// One-line explanation of what the pattern suggests
    pub const fn description(self) -> &'static str {
        match self {
            PatternTag::Doji => "small body; indicates market indecision.",
            PatternTag::Hammer => "long lower shadow; signals potential bullish reversal.",
            PatternTag::InvertedHammer => {
                "long upper shadow; bullish reversal during downtrend."
            }
            PatternTag::BullishEngulfing => "green candle fully engulfs previous red candle.",
            PatternTag::BearishEngulfing => "red candle fully engulfs previous green candle.",
        }
    }

    /// Returns the typical direction this pattern signals.
    pub fn typical_direction(self) -> Direction {
        match self {
            PatternTag::Doji => Direction::Neutral,
            PatternTag::Hammer | PatternTag::InvertedHammer | PatternTag::BullishEngulfing => {
                Direction::Bullish
            }
            PatternTag::BearishEngulfing => Direction::Bearish,
        }
    }

    /// Number of bars the pattern spans
    pub fn bar_count(self) -> usize {
        match self {
            PatternTag::BullishEngulfing | PatternTag::BearishEngulfing => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternTag {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        PatternTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| PatternError::UnknownPattern(s.to_string()))
    }
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// PATTERN MATCH - result of detection (Copy, no allocations)
// ============================================================

/// Result of pattern detection at one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PatternMatch {
    pub tag: PatternTag,
    /// First bar the pattern covers (the previous bar for engulfing)
    pub start_index: usize,
    /// Bar the label is attached to
    pub end_index: usize,
}

impl PatternMatch {
    #[inline]
    pub fn single(tag: PatternTag, index: usize) -> Self {
        Self {
            tag,
            start_index: index,
            end_index: index,
        }
    }

    #[inline]
    pub fn spanning(tag: PatternTag, start_index: usize, end_index: usize) -> Self {
        Self {
            tag,
            start_index,
            end_index,
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.tag.typical_direction()
    }
}

// ============================================================
// PATTERN MAP - sparse index -> tag labelling
// ============================================================

/// Sparse labelling of a bar sequence: at most one tag per bar index.
///
/// Stored densely as one `Option<PatternTag>` per bar. Equality compares the
/// labelled entries only, so two maps with the same labels are equal even if
/// they cover a different number of unlabelled trailing bars.
#[derive(Debug, Clone, Default)]
pub struct PatternMap {
    labels: Vec<Option<PatternTag>>,
}

impl PatternMap {
    /// Empty labelling covering `bar_count` bars
    pub fn with_bar_count(bar_count: usize) -> Self {
        Self {
            labels: vec![None; bar_count],
        }
    }

    /// Wrap one optional label per bar
    pub fn from_labels(labels: Vec<Option<PatternTag>>) -> Self {
        Self { labels }
    }

    /// Largest index accepted by [`from_entries`](Self::from_entries)
    pub const MAX_INDEX: usize = (1 << 24) - 1;

    /// Build from `(index, tag)` pairs; a later pair for the same index wins.
    ///
    /// The map is sized to the largest index, so indices above
    /// [`MAX_INDEX`](Self::MAX_INDEX) are rejected rather than allocated.
    pub fn from_entries<I: IntoIterator<Item = (usize, PatternTag)>>(entries: I) -> Result<Self> {
        let mut map = PatternMap::default();
        for (index, tag) in entries {
            if index > Self::MAX_INDEX {
                return Err(PatternError::OutOfRange {
                    field: "PatternMap index",
                    value: index as f64,
                    min: 0.0,
                    max: Self::MAX_INDEX as f64,
                });
            }
            if index >= map.labels.len() {
                map.labels.resize(index + 1, None);
            }
            map.labels[index] = Some(tag);
        }
        Ok(map)
    }

    /// Tag at `index`, `None` when the bar has no pattern or is out of range
    #[inline]
    pub fn get(&self, index: usize) -> Option<PatternTag> {
        self.labels.get(index).copied().flatten()
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of labelled bars
    pub fn len(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    /// True when no bar carries a label
    pub fn is_empty(&self) -> bool {
        self.labels.iter().all(Option::is_none)
    }

    /// Number of bars covered, labelled or not
    #[inline]
    pub fn bar_count(&self) -> usize {
        self.labels.len()
    }

    /// Labelled entries in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, PatternTag)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.map(|tag| (i, tag)))
    }

    #[inline]
    pub fn labels(&self) -> &[Option<PatternTag>] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<Option<PatternTag>> {
        self.labels
    }

    /// Per-tag totals
    pub fn counts(&self) -> PatternCounts {
        let mut counts = PatternCounts::default();
        for (_, tag) in self.iter() {
            counts.add(tag);
        }
        counts
    }

    pub fn to_btree_map(&self) -> BTreeMap<usize, PatternTag> {
        self.iter().collect()
    }
}

impl PartialEq for PatternMap {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl serde::Serialize for PatternMap {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = s.serialize_map(Some(self.len()))?;
        for (index, tag) in self.iter() {
            map.serialize_entry(&index, &tag)?;
        }
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for PatternMap {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let entries = BTreeMap::<usize, PatternTag>::deserialize(d)?;
        PatternMap::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

/// Number of bars carrying each tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCounts {
    pub doji: usize,
    pub hammer: usize,
    pub inverted_hammer: usize,
    pub bullish_engulfing: usize,
    pub bearish_engulfing: usize,
}

impl PatternCounts {
    fn slot(&mut self, tag: PatternTag) -> &mut usize {
        match tag {
            PatternTag::Doji => &mut self.doji,
            PatternTag::Hammer => &mut self.hammer,
            PatternTag::InvertedHammer => &mut self.inverted_hammer,
            PatternTag::BullishEngulfing => &mut self.bullish_engulfing,
            PatternTag::BearishEngulfing => &mut self.bearish_engulfing,
        }
    }

    pub fn add(&mut self, tag: PatternTag) {
        *self.slot(tag) += 1;
    }

    pub fn get(&self, tag: PatternTag) -> usize {
        match tag {
            PatternTag::Doji => self.doji,
            PatternTag::Hammer => self.hammer,
            PatternTag::InvertedHammer => self.inverted_hammer,
            PatternTag::BullishEngulfing => self.bullish_engulfing,
            PatternTag::BearishEngulfing => self.bearish_engulfing,
        }
    }

    pub fn total(&self) -> usize {
        PatternTag::ALL.iter().map(|&tag| self.get(tag)).sum()
    }
}

/// `Doji: 3 · Hammer: 1 · Inverted: 0 · Bull Engulf: 2 · Bear Engulf: 4`
impl fmt::Display for PatternCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in PatternTag::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(" · ")?;
            }
            write!(f, "{}: {}", tag.short_name(), self.get(*tag))?;
        }
        Ok(())
    }
}

// ============================================================
// PATTERN DETECTOR TRAITS
// ============================================================

/// Category of pattern by number of bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCategory {
    SingleBar,
    TwoBar,
}

/// Additional metadata about a detector
#[derive(Debug, Clone)]
pub struct PatternMetadata {
    pub name: &'static str,
    pub tags: &'static [PatternTag],
    pub category: PatternCategory,
}

/// Pattern detector trait
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &'static str;
    /// Tags this detector can emit
    fn tags(&self) -> &'static [PatternTag];
    fn min_bars(&self) -> usize;
    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    fn metadata(&self) -> PatternMetadata {
        PatternMetadata {
            name: self.name(),
            tags: self.tags(),
            category: match self.min_bars() {
                1 => PatternCategory::SingleBar,
                _ => PatternCategory::TwoBar,
            },
        }
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch, no vtable
        #[derive(Debug, Clone, Copy)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn tags(&self) -> &'static [PatternTag] {
                match self {
                    $(Self::$variant(d) => PatternDetector::tags(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }

            pub fn metadata(&self) -> PatternMetadata {
                match self {
                    $(Self::$variant(d) => PatternDetector::metadata(d)),*
                }
            }
        }
    };
}

// Declaration order is also the default precedence order
define_builtin_detectors! {
    // Single bar (3)
    Doji(DojiDetector),
    Hammer(HammerDetector),
    InvertedHammer(InvertedHammerDetector),

    // Two bar (1)
    Engulfing(EngulfingDetector),
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validate_data: bool,
    /// Labels outside this set are dropped after precedence is resolved
    pub pattern_filter: Option<Vec<PatternTag>>,
}

/// Main pattern detection engine
///
/// Detectors are tried in order at every bar and the first match wins, so the
/// order detectors are added in is their precedence.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    builtin: Vec<BuiltinDetector>,
    config: EngineConfig,
}

impl Default for PatternEngine {
    /// Doji, hammer, inverted hammer, engulfing - no validation, no filter
    fn default() -> Self {
        Self {
            builtin: builtin_defaults![Doji, Hammer, InvertedHammer, Engulfing].to_vec(),
            config: EngineConfig::default(),
        }
    }
}

impl PatternEngine {
    /// Detectors in precedence order
    pub fn detectors(&self) -> &[BuiltinDetector] {
        &self.builtin
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===========================================
    // LOW-LEVEL: Single bar / Range
    // ===========================================

    /// Detect the pattern at a single bar index.
    ///
    /// `bars[index - 1]` is used as look-back, so a sub-slice scan should pass
    /// the full sequence and a shifted index rather than a re-based slice.
    pub fn scan_at<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if index >= bars.len() {
            return None;
        }
        let m = self
            .builtin
            .iter()
            .filter(|d| index >= d.min_bars().saturating_sub(1))
            .find_map(|d| d.detect(bars, index))?;
        self.should_include(&m).then_some(m)
    }

    /// Detect patterns in a range of bars.
    pub fn scan_range<T: OHLCV>(
        &self,
        bars: &[T],
        range: std::ops::Range<usize>,
    ) -> Vec<PatternMatch> {
        range.filter_map(|i| self.scan_at(bars, i)).collect()
    }

    // ===========================================
    // HIGH-LEVEL: Batch processing
    // ===========================================

    /// Label every bar. Never fails and never validates.
    pub fn label_all<T: OHLCV>(&self, bars: &[T]) -> PatternMap {
        let mut map = PatternMap::with_bar_count(bars.len());
        for i in 0..bars.len() {
            if let Some(m) = self.scan_at(bars, i) {
                tracing::trace!(index = m.end_index, tag = %m.tag, "pattern matched");
                map.labels[m.end_index] = Some(m.tag);
            }
        }
        map
    }

    /// Scan all bars, validating first if the engine was built with
    /// `validate_data(true)`.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<PatternMap> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let map = self.label_all(bars);
        tracing::debug!(bars = bars.len(), labelled = map.len(), "scanned bars");
        Ok(map)
    }

    /// Scan all bars and return the flat list of matches.
    pub fn scan_matches<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<PatternMatch>> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        Ok(self.scan_range(bars, 0..bars.len()))
    }

    /// Label every bar using the rayon thread pool.
    ///
    /// Each index only reads itself and the previous bar, so the result is
    /// identical to [`label_all`](Self::label_all).
    pub fn scan_par<T: OHLCV + Sync>(&self, bars: &[T]) -> PatternMap {
        let labels: Vec<Option<PatternTag>> = (0..bars.len())
            .into_par_iter()
            .map(|i| self.scan_at(bars, i).map(|m| m.tag))
            .collect();
        PatternMap::from_labels(labels)
    }

    /// Create an iterator over bars with their patterns.
    pub fn iter<'a, T: OHLCV>(&'a self, bars: &'a [T]) -> PatternIterator<'a, T> {
        PatternIterator::new(self, bars)
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn should_include(&self, m: &PatternMatch) -> bool {
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&m.tag) {
                return false;
            }
        }
        true
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidOHLCV { reason, .. } => {
                    PatternError::InvalidOHLCV { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        Ok(())
    }
}

/// Label `bars` with the default rules.
///
/// Equivalent to `PatternEngine::default().label_all(bars)`: doji, then
/// hammer, then inverted hammer, then engulfing, first match wins. Input is
/// never validated; degenerate bars simply fall through the rules.
pub fn detect<T: OHLCV>(bars: &[T]) -> PatternMap {
    PatternEngine::default().label_all(bars)
}

// ============================================================
// PATTERN ITERATOR
// ============================================================

/// Pattern found at a specific bar
#[derive(Debug, Clone, Copy)]
pub struct BarPattern {
    pub index: usize,
    pub pattern: Option<PatternMatch>,
}

/// Iterator over bars with their patterns
pub struct PatternIterator<'a, T: OHLCV> {
    engine: &'a PatternEngine,
    bars: &'a [T],
    current: usize,
}

impl<'a, T: OHLCV> PatternIterator<'a, T> {
    fn new(engine: &'a PatternEngine, bars: &'a [T]) -> Self {
        Self {
            engine,
            bars,
            current: 0,
        }
    }
}

impl<'a, T: OHLCV> Iterator for PatternIterator<'a, T> {
    type Item = BarPattern;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.bars.len() {
            return None;
        }

        let index = self.current;
        let pattern = self.engine.scan_at(self.bars, index);

        self.current += 1;

        Some(BarPattern { index, pattern })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bars.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, T: OHLCV> ExactSizeIterator for PatternIterator<'a, T> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all builtin patterns with default configurations, in default precedence
    pub fn with_all_defaults(self) -> Self {
        self.with_single_bar_defaults().with_two_bar_defaults()
    }

    /// Add single-bar patterns with defaults (3)
    pub fn with_single_bar_defaults(mut self) -> Self {
        self.builtin
            .extend(builtin_defaults![Doji, Hammer, InvertedHammer]);
        self
    }

    /// Add two-bar patterns with defaults (1)
    pub fn with_two_bar_defaults(mut self) -> Self {
        self.builtin.extend(builtin_defaults![Engulfing]);
        self
    }

    /// Add a builtin detector after the ones already added
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Enable/disable data validation in `scan`
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Keep only these labels in the output
    pub fn only_patterns(mut self, tags: impl IntoIterator<Item = PatternTag>) -> Self {
        self.config.pattern_filter = Some(tags.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        let engine = PatternEngine {
            builtin: self.builtin,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub patterns: PatternMap,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &PatternEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|patterns| ScanResult {
                    symbol: symbol.to_string(),
                    patterns,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Custom bar type, as a caller would bring
    #[derive(Debug, Clone)]
    struct Quote {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl Quote {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self { o, h, l, c }
        }
    }

    impl OHLCV for Quote {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }
    }

    fn mixed_bars() -> Vec<Bar> {
        vec![
            Bar::new(0, 10.0, 10.1, 9.9, 10.01), // doji
            Bar::new(1, 10.0, 10.1, 9.4, 9.5),   // bearish, nothing
            Bar::new(2, 9.4, 10.3, 9.3, 10.2),   // bullish engulfing
            Bar::new(3, 10.0, 11.0, 7.0, 11.0),  // hammer
            Bar::new(4, 11.0, 14.0, 10.0, 10.0), // inverted hammer
        ]
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.5).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_ratio_deserialize_validates() {
        let ok: Ratio = serde_json::from_str("0.25").unwrap();
        assert_eq!(ok.get(), 0.25);
        assert!(serde_json::from_str::<Ratio>("1.5").is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Quote::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_shadow(), 5.0);
        assert_eq!(bar.lower_shadow(), 10.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!((bar.body_ratio().unwrap() - 0.25).abs() < 0.001);
        assert!(Quote::new(1.0, 1.0, 1.0, 1.0).body_ratio().is_none());
    }

    #[test]
    fn test_ohlcv_validate() {
        assert!(Bar::new(0, 10.0, 11.0, 9.0, 10.5).validate().is_ok());
        assert!(Bar::new(0, 10.0, 9.0, 11.0, 10.5).validate().is_err());
        assert!(Bar::new(0, 10.0, 11.0, 10.2, 10.5).validate().is_err());
        assert!(Bar::new(0, 10.0, 10.2, 9.0, 10.5).validate().is_err());
        assert!(Bar::new(0, f64::NAN, 11.0, 9.0, 10.5).validate().is_err());
        assert!(Bar::new(0, 10.0, f64::INFINITY, 9.0, 10.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_tag_strings() {
        for tag in PatternTag::ALL {
            assert_eq!(tag.as_str().parse::<PatternTag>().unwrap(), tag);
            assert_eq!(
                serde_json::to_string(&tag).unwrap(),
                format!("\"{}\"", tag.as_str())
            );
        }
        assert!(matches!(
            "engulfing".parse::<PatternTag>(),
            Err(PatternError::UnknownPattern(_))
        ));
    }

    #[test]
    fn test_tag_directions() {
        assert_eq!(PatternTag::Doji.typical_direction(), Direction::Neutral);
        assert!(PatternTag::Hammer.typical_direction().is_bullish());
        assert!(PatternTag::BearishEngulfing.typical_direction().is_bearish());
        assert_eq!(PatternTag::BullishEngulfing.bar_count(), 2);
        assert_eq!(PatternTag::InvertedHammer.bar_count(), 1);
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_builder_defaults_match_default_engine() {
        let built = EngineBuilder::new().with_all_defaults().build().unwrap();
        let names: Vec<_> = built.detectors().iter().map(|d| d.name()).collect();
        let default: Vec<_> = PatternEngine::default()
            .detectors()
            .iter()
            .map(|d| d.name())
            .collect();
        assert_eq!(names, default);
        assert_eq!(names, ["doji", "hammer", "inverted_hammer", "engulfing"]);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let bad = BuiltinDetector::Hammer(HammerDetector {
            shadow_verylong_factor: f64::INFINITY,
            ..Default::default()
        });
        assert!(EngineBuilder::new().add(bad).build().is_err());
        assert!(EngineBuilder::new().add_checked(bad).is_err());
    }

    #[test]
    fn test_empty_scan() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Bar> = vec![];
        let patterns = engine.scan(&bars).unwrap();
        assert!(patterns.is_empty());
        assert_eq!(patterns.bar_count(), 0);
        assert!(detect(&bars).is_empty());
    }

    #[test]
    fn test_detect_mixed() {
        let map = detect(&mixed_bars());
        assert_eq!(map.bar_count(), 5);
        assert_eq!(map.len(), 4);
        assert_eq!(map.get(0), Some(PatternTag::Doji));
        assert_eq!(map.get(1), None);
        assert_eq!(map.get(2), Some(PatternTag::BullishEngulfing));
        assert_eq!(map.get(3), Some(PatternTag::Hammer));
        assert_eq!(map.get(4), Some(PatternTag::InvertedHammer));
        assert_eq!(map.get(99), None);
    }

    #[test]
    fn test_precedence_is_insertion_order() {
        // A zero-body bar with a long lower shadow: doji first by default
        let bars = [Bar::new(0, 10.0, 10.0, 9.0, 10.0)];
        assert_eq!(detect(&bars).get(0), Some(PatternTag::Doji));

        let hammer_first = EngineBuilder::new()
            .add(BuiltinDetector::Hammer(HammerDetector::with_defaults()))
            .add(BuiltinDetector::Doji(DojiDetector::with_defaults()))
            .build()
            .unwrap();
        assert_eq!(
            hammer_first.scan(&bars).unwrap().get(0),
            Some(PatternTag::Hammer)
        );
    }

    #[test]
    fn test_pattern_filter_does_not_reclassify() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .only_patterns([PatternTag::Hammer])
            .build()
            .unwrap();

        // Doji wins precedence, then gets filtered out: no hammer fallback
        let bars = [Bar::new(0, 10.0, 10.0, 9.0, 10.0)];
        assert!(engine.scan(&bars).unwrap().is_empty());

        let map = engine.scan(&mixed_bars()).unwrap();
        assert_eq!(map.to_btree_map().into_iter().collect::<Vec<_>>(), [(3, PatternTag::Hammer)]);
    }

    #[test]
    fn test_validate_data() {
        let bars = [Bar::new(0, 10.0, 11.0, 9.0, 10.5), Bar::new(1, 10.0, 9.0, 11.0, 10.5)];

        let lenient = PatternEngine::default();
        assert!(lenient.scan(&bars).is_ok());

        let strict = EngineBuilder::new()
            .with_all_defaults()
            .validate_data(true)
            .build()
            .unwrap();
        match strict.scan(&bars) {
            Err(PatternError::InvalidOHLCV { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidOHLCV, got {other:?}"),
        }
        assert!(strict.scan_matches(&bars).is_err());
    }

    #[test]
    fn test_custom_bar_type() {
        let quotes = vec![
            Quote::new(10.0, 10.1, 9.4, 9.5),
            Quote::new(9.4, 10.3, 9.3, 10.2),
        ];
        let map = detect(&quotes);
        assert_eq!(map.get(1), Some(PatternTag::BullishEngulfing));
    }

    #[test]
    fn test_scan_matches_spans() {
        let matches = PatternEngine::default().scan_matches(&mixed_bars()).unwrap();
        assert_eq!(matches.len(), 4);
        let engulf = matches
            .iter()
            .find(|m| m.tag == PatternTag::BullishEngulfing)
            .unwrap();
        assert_eq!((engulf.start_index, engulf.end_index), (1, 2));
        assert!(matches
            .iter()
            .filter(|m| m.tag.bar_count() == 1)
            .all(|m| m.start_index == m.end_index));
    }

    #[test]
    fn test_iterator() {
        let engine = PatternEngine::default();
        let bars = mixed_bars();

        let results: Vec<_> = engine.iter(&bars).collect();
        assert_eq!(results.len(), bars.len());
        assert!(results[1].pattern.is_none());
        assert_eq!(results[3].index, 3);
        assert_eq!(results[3].pattern.map(|m| m.tag), Some(PatternTag::Hammer));
    }

    #[test]
    fn test_iterator_exact_size() {
        let engine = PatternEngine::default();
        let bars = mixed_bars();

        let mut iter = engine.iter(&bars);
        assert_eq!(iter.len(), 5);
        iter.next();
        assert_eq!(iter.len(), 4);
    }

    #[test]
    fn test_scan_at() {
        let engine = PatternEngine::default();
        let bars = mixed_bars();
        assert_eq!(engine.scan_at(&bars, 0).map(|m| m.tag), Some(PatternTag::Doji));
        assert!(engine.scan_at(&bars, 1).is_none());
        assert!(engine.scan_at(&bars, 5).is_none());
    }

    #[test]
    fn test_scan_range_uses_lookback() {
        let engine = PatternEngine::default();
        let bars = mixed_bars();

        // Range starts at the engulfing bar; the previous bar is still visible
        let matches = engine.scan_range(&bars, 2..4);
        let tags: Vec<_> = matches.iter().map(|m| m.tag).collect();
        assert_eq!(tags, [PatternTag::BullishEngulfing, PatternTag::Hammer]);

        // A re-based slice loses the look-back
        assert!(engine.scan_at(&bars[2..], 0).is_none());
    }

    #[test]
    fn test_scan_par_matches_sequential() {
        let bars: Vec<Bar> = (0..200)
            .flat_map(|_| mixed_bars())
            .enumerate()
            .map(|(i, b)| Bar { time: i as i64, ..b })
            .collect();
        let engine = PatternEngine::default();
        assert_eq!(engine.scan_par(&bars), engine.label_all(&bars));
        assert_eq!(
            engine.scan_par(&bars).labels(),
            engine.label_all(&bars).labels()
        );
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .validate_data(true)
            .build()
            .unwrap();

        let good = mixed_bars();
        let bad = vec![Bar::new(0, 10.0, 9.0, 11.0, 10.0)];

        let instruments: Vec<(&str, &[Bar])> = vec![("AAPL", &good), ("BAD", &bad)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "AAPL");
        assert_eq!(results[0].patterns.len(), 4);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
    }

    #[test]
    fn test_pattern_map_json() {
        let map = detect(&mixed_bars());
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"0":"doji","2":"bullishEngulfing","3":"hammer","4":"invertedHammer"}"#
        );

        let back: PatternMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.bar_count(), 5);
    }

    #[test]
    fn test_pattern_map_equality_ignores_trailing_bars() {
        let short = PatternMap::from_entries([(1, PatternTag::Doji)]).unwrap();
        let mut labels = vec![None; 10];
        labels[1] = Some(PatternTag::Doji);
        assert_eq!(short, PatternMap::from_labels(labels.clone()));
        labels[9] = Some(PatternTag::Hammer);
        assert_ne!(short, PatternMap::from_labels(labels));
    }

    #[test]
    fn test_pattern_map_rejects_huge_index() {
        for json in [
            r#"{"18446744073709551615":"doji"}"#,
            r#"{"4000000000":"doji"}"#,
        ] {
            let parsed = std::panic::catch_unwind(|| serde_json::from_str::<PatternMap>(json));
            assert!(matches!(parsed, Ok(Err(_))), "{json}");
        }

        assert!(matches!(
            PatternMap::from_entries([(usize::MAX, PatternTag::Doji)]),
            Err(PatternError::OutOfRange { .. })
        ));
        let edge = PatternMap::from_entries([(PatternMap::MAX_INDEX, PatternTag::Hammer)]).unwrap();
        assert_eq!(edge.get(PatternMap::MAX_INDEX), Some(PatternTag::Hammer));
    }

    #[test]
    fn test_scan_at_far_out_of_range() {
        let engine = PatternEngine::default();
        let bars = mixed_bars();
        assert!(engine.scan_at(&bars, usize::MAX).is_none());
        assert!(engine.scan_range(&bars, usize::MAX - 2..usize::MAX).is_empty());
        let empty: [Bar; 0] = [];
        assert!(engine.scan_at(&empty, 0).is_none());
    }

    #[test]
    fn test_counts() {
        let counts = detect(&mixed_bars()).counts();
        assert_eq!(counts.doji, 1);
        assert_eq!(counts.bullish_engulfing, 1);
        assert_eq!(counts.bearish_engulfing, 0);
        assert_eq!(counts.total(), 4);
        assert_eq!(
            counts.to_string(),
            "Doji: 1 · Hammer: 1 · Inverted: 1 · Bull Engulf: 1 · Bear Engulf: 0"
        );
    }

    #[test]
    fn test_metadata() {
        let engine = PatternEngine::default();
        let meta = engine.detectors()[3].metadata();
        assert_eq!(meta.name, "engulfing");
        assert_eq!(meta.category, PatternCategory::TwoBar);
        assert_eq!(meta.tags.len(), 2);
        assert_eq!(
            engine.detectors()[0].metadata().category,
            PatternCategory::SingleBar
        );
    }
}
