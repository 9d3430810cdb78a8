//! Presentation model for a labelled chart
//!
//! Turns bars plus their [`PatternMap`] into per-candle colours, opacities and
//! tooltip text for a given filter selection. Nothing here draws; a front-end
//! (SVG, terminal, canvas) consumes [`CandleStyle`] and [`Tooltip`].

use std::fmt;
use std::str::FromStr;

use crate::{OHLCVExt, PatternError, PatternMap, PatternTag, Result, OHLCV};

// ============================================================
// COLOURS
// ============================================================

/// CSS hex colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub const BULL: Color = Color("#4ade80");
    pub const BEAR: Color = Color("#f87171");
    /// Wick colour of candles outside the selection
    pub const MUTED_WICK: Color = Color("#64748b");
    /// Tooltip chip of an unlabelled candle
    pub const CHIP_NONE: Color = Color("#94a3b8");

    #[inline]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Candle colour for a labelled bar
pub const fn pattern_color(tag: PatternTag) -> Color {
    match tag {
        PatternTag::Doji => Color("#facc15"),
        PatternTag::Hammer => Color("#10b981"),
        PatternTag::InvertedHammer => Color("#a78bfa"),
        PatternTag::BullishEngulfing => Color("#60a5fa"),
        PatternTag::BearishEngulfing => Color("#fb7185"),
    }
}

/// Tooltip chip colour
pub const fn chip_color(label: Option<PatternTag>) -> Color {
    match label {
        Some(PatternTag::Doji) => Color("#eab308"),
        Some(PatternTag::Hammer) => Color("#22c55e"),
        Some(PatternTag::InvertedHammer) => Color("#8b5cf6"),
        Some(PatternTag::BullishEngulfing) => Color("#60a5fa"),
        Some(PatternTag::BearishEngulfing) => Color("#f43f5e"),
        None => Color::CHIP_NONE,
    }
}

// ============================================================
// SELECTION
// ============================================================

/// Which labels are in focus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternFilter {
    #[default]
    All,
    Only(PatternTag),
}

impl PatternFilter {
    /// `All` selects every candle, labelled or not
    #[inline]
    pub fn selects(self, label: Option<PatternTag>) -> bool {
        match self {
            PatternFilter::All => true,
            PatternFilter::Only(tag) => label == Some(tag),
        }
    }
}

impl fmt::Display for PatternFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternFilter::All => f.write_str("all"),
            PatternFilter::Only(tag) => fmt::Display::fmt(tag, f),
        }
    }
}

impl FromStr for PatternFilter {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(PatternFilter::All),
            other => other.parse().map(PatternFilter::Only),
        }
    }
}

impl serde::Serialize for PatternFilter {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PatternFilter {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Filter plus whether unselected candles are dimmed hard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub filter: PatternFilter,
    pub highlight_only: bool,
}

impl Selection {
    pub fn new(filter: PatternFilter, highlight_only: bool) -> Self {
        Self {
            filter,
            highlight_only,
        }
    }
}

// ============================================================
// CANDLE STYLE
// ============================================================

/// Fill of the candle body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFill {
    Solid(Color),
    BullGradient,
    BearGradient,
}

/// Everything needed to draw one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleStyle {
    pub selected: bool,
    pub color: Color,
    pub wick_color: Color,
    pub wick_opacity: f64,
    pub body_fill: BodyFill,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub body_opacity: f64,
    pub glow: bool,
}

/// Style one candle given its label and the current selection
pub fn candle_style<T: OHLCV>(
    bar: &T,
    label: Option<PatternTag>,
    selection: Selection,
) -> CandleStyle {
    let bullish = bar.is_bullish();
    let color = match label {
        Some(tag) => pattern_color(tag),
        None if bullish => Color::BULL,
        None => Color::BEAR,
    };
    let selected = selection.filter.selects(label);

    let (wick_opacity, body_opacity) = match (selected, selection.highlight_only) {
        (true, _) => (0.95, 1.0),
        (false, true) => (0.15, 0.18),
        (false, false) => (0.45, 0.5),
    };

    let body_fill = match label {
        Some(_) => BodyFill::Solid(color),
        None if bullish => BodyFill::BullGradient,
        None => BodyFill::BearGradient,
    };

    CandleStyle {
        selected,
        color,
        wick_color: if selected { color } else { Color::MUTED_WICK },
        wick_opacity,
        body_fill,
        stroke: label.map(|_| color),
        stroke_width: if label.is_some() { 2.0 } else { 0.0 },
        body_opacity,
        glow: selected && label.is_some(),
    }
}

/// Style every bar of a labelled series
pub fn style_all<T: OHLCV>(
    bars: &[T],
    patterns: &PatternMap,
    selection: Selection,
) -> Vec<CandleStyle> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| candle_style(bar, patterns.get(i), selection))
        .collect()
}

// ============================================================
// TOOLTIP
// ============================================================

/// Hover text for one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip {
    /// 1-based day number
    pub day: usize,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub pattern: Option<PatternTag>,
    pub chip: Color,
}

impl Tooltip {
    pub fn new<T: OHLCV>(index: usize, bar: &T, label: Option<PatternTag>) -> Self {
        Self {
            day: index + 1,
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
            pattern: label,
            chip: chip_color(label),
        }
    }
}

impl fmt::Display for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Day {}", self.day)?;
        writeln!(f, "Open: {}", self.open)?;
        writeln!(f, "High: {}", self.high)?;
        writeln!(f, "Low: {}", self.low)?;
        write!(f, "Close: {}", self.close)?;
        if let Some(tag) = self.pattern {
            write!(f, "\nPattern: {tag}")?;
        }
        Ok(())
    }
}

// ============================================================
// LEGEND
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub tag: PatternTag,
    pub name: &'static str,
    pub description: &'static str,
}

impl LegendEntry {
    const fn of(tag: PatternTag) -> Self {
        Self {
            tag,
            name: tag.display_name(),
            description: tag.description(),
        }
    }
}

impl fmt::Display for LegendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.description)
    }
}

pub const LEGEND: [LegendEntry; 5] = [
    LegendEntry::of(PatternTag::Doji),
    LegendEntry::of(PatternTag::Hammer),
    LegendEntry::of(PatternTag::InvertedHammer),
    LegendEntry::of(PatternTag::BullishEngulfing),
    LegendEntry::of(PatternTag::BearishEngulfing),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    const BULL_BAR: Bar = Bar::new(0, 10.0, 12.0, 9.0, 11.5);
    const BEAR_BAR: Bar = Bar::new(1, 11.5, 12.0, 9.0, 10.0);

    #[test]
    fn test_filter_parse() {
        assert_eq!("all".parse::<PatternFilter>().unwrap(), PatternFilter::All);
        assert_eq!(
            "bearishEngulfing".parse::<PatternFilter>().unwrap(),
            PatternFilter::Only(PatternTag::BearishEngulfing)
        );
        assert!("All".parse::<PatternFilter>().is_err());
        assert_eq!(PatternFilter::Only(PatternTag::Doji).to_string(), "doji");
    }

    #[test]
    fn test_filter_serde() {
        let f: PatternFilter = serde_json::from_str("\"invertedHammer\"").unwrap();
        assert_eq!(f, PatternFilter::Only(PatternTag::InvertedHammer));
        assert_eq!(serde_json::to_string(&PatternFilter::All).unwrap(), "\"all\"");
    }

    #[test]
    fn test_unlabelled_all_selected() {
        let style = candle_style(&BULL_BAR, None, Selection::default());
        assert!(style.selected);
        assert_eq!(style.color, Color::BULL);
        assert_eq!(style.wick_color, Color::BULL);
        assert_eq!(style.wick_opacity, 0.95);
        assert_eq!(style.body_fill, BodyFill::BullGradient);
        assert_eq!(style.stroke, None);
        assert_eq!(style.stroke_width, 0.0);
        assert_eq!(style.body_opacity, 1.0);
        assert!(!style.glow);

        let bear = candle_style(&BEAR_BAR, None, Selection::default());
        assert_eq!(bear.color, Color::BEAR);
        assert_eq!(bear.body_fill, BodyFill::BearGradient);
    }

    #[test]
    fn test_labelled_selected_glows() {
        let style = candle_style(&BEAR_BAR, Some(PatternTag::Hammer), Selection::default());
        assert_eq!(style.color.as_str(), "#10b981");
        assert_eq!(style.body_fill, BodyFill::Solid(style.color));
        assert_eq!(style.stroke, Some(style.color));
        assert_eq!(style.stroke_width, 2.0);
        assert!(style.glow);
    }

    #[test]
    fn test_unselected_dimming() {
        let only_doji = PatternFilter::Only(PatternTag::Doji);

        let dim = candle_style(&BULL_BAR, Some(PatternTag::Hammer), Selection::new(only_doji, false));
        assert!(!dim.selected);
        assert_eq!(dim.wick_color, Color::MUTED_WICK);
        assert_eq!((dim.wick_opacity, dim.body_opacity), (0.45, 0.5));
        assert!(!dim.glow);
        // still keeps its own pattern colour and stroke
        assert_eq!(dim.stroke, Some(pattern_color(PatternTag::Hammer)));

        let faint = candle_style(&BULL_BAR, None, Selection::new(only_doji, true));
        assert_eq!((faint.wick_opacity, faint.body_opacity), (0.15, 0.18));

        let picked = candle_style(&BULL_BAR, Some(PatternTag::Doji), Selection::new(only_doji, true));
        assert!(picked.selected && picked.glow);
        assert_eq!(picked.body_opacity, 1.0);
    }

    #[test]
    fn test_style_all() {
        let bars = [BULL_BAR, BEAR_BAR];
        let patterns = PatternMap::from_entries([(1, PatternTag::BearishEngulfing)]).unwrap();
        let styles = style_all(&bars, &patterns, Selection::default());
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0].stroke, None);
        assert_eq!(styles[1].color.as_str(), "#fb7185");
    }

    #[test]
    fn test_tooltip() {
        let tip = Tooltip::new(3, &Bar::new(3, 10.0, 11.0, 7.0, 11.0), Some(PatternTag::Hammer));
        assert_eq!(tip.chip.as_str(), "#22c55e");
        assert_eq!(
            tip.to_string(),
            "Day 4\nOpen: 10\nHigh: 11\nLow: 7\nClose: 11\nPattern: hammer"
        );

        let plain = Tooltip::new(0, &BULL_BAR, None);
        assert_eq!(plain.chip, Color::CHIP_NONE);
        assert!(plain.to_string().ends_with("Close: 11.5"));
    }

    #[test]
    fn test_legend() {
        assert_eq!(LEGEND.len(), PatternTag::ALL.len());
        assert_eq!(
            LEGEND[2].to_string(),
            "Inverted Hammer - long upper shadow; bullish reversal during downtrend."
        );
    }
}
