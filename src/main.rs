mod cli;

use std::io::{self, Write};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

use candlescope::render::{Selection, Tooltip};
use candlescope::{Bar, EngineBuilder, PatternCounts, PatternEngine, PatternMap};
use cli::{Cli, OutputFormat};

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the report
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
}

/// Default rules; `strict` adds OHLC validation before labelling
fn build_engine(strict: bool) -> Result<PatternEngine> {
    if !strict {
        return Ok(PatternEngine::default());
    }
    Ok(EngineBuilder::new()
        .with_all_defaults()
        .validate_data(true)
        .build()?)
}

#[derive(serde::Serialize)]
struct Report<'a> {
    bars: &'a [Bar],
    patterns: &'a PatternMap,
    counts: PatternCounts,
}

impl<'a> Report<'a> {
    fn new(bars: &'a [Bar], patterns: &'a PatternMap) -> Self {
        Self {
            bars,
            patterns,
            counts: patterns.counts(),
        }
    }
}

fn write_text(
    out: &mut impl Write,
    bars: &[Bar],
    patterns: &PatternMap,
    selection: Selection,
) -> io::Result<()> {
    writeln!(out, "{}", patterns.counts())?;
    writeln!(out, "Filter: {}", selection.filter)?;

    for (index, tag) in patterns.iter() {
        let Some(bar) = bars.get(index) else { continue };
        if selection.filter.selects(Some(tag)) {
            writeln!(out)?;
            writeln!(out, "{}", Tooltip::new(index, bar, Some(tag)))?;
        } else if !selection.highlight_only {
            writeln!(out)?;
            writeln!(out, "Day {}: {tag}", index + 1)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let bars = cli.load_bars()?;
    tracing::info!(bars = bars.len(), source = ?cli.input, "loaded bars");

    let engine = build_engine(cli.strict)?;
    let patterns = engine.scan(&bars)?;
    tracing::info!(labelled = patterns.len(), "detected patterns");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => write_text(&mut out, &bars, &patterns, cli.selection())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &Report::new(&bars, &patterns))?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlescope::render::PatternFilter;
    use candlescope::{detect, PatternTag};

    /// doji, nothing, bullish engulfing, hammer
    fn sample_bars() -> Vec<Bar> {
        vec![
            Bar::new(0, 10.0, 10.1, 9.9, 10.01),
            Bar::new(1, 10.0, 10.1, 9.4, 9.5),
            Bar::new(2, 9.4, 10.3, 9.3, 10.2),
            Bar::new(3, 10.0, 11.0, 7.0, 11.0),
        ]
    }

    fn render_text(bars: &[Bar], selection: Selection) -> String {
        let patterns = detect(bars);
        let mut out = Vec::new();
        write_text(&mut out, bars, &patterns, selection).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_lists_every_label_for_all() {
        let text = render_text(&sample_bars(), Selection::default());
        let expected = "\
Doji: 1 · Hammer: 1 · Inverted: 0 · Bull Engulf: 1 · Bear Engulf: 0
Filter: all

Day 1
Open: 10
High: 10.1
Low: 9.9
Close: 10.01
Pattern: doji

Day 3
Open: 9.4
High: 10.3
Low: 9.3
Close: 10.2
Pattern: bullishEngulfing

Day 4
Open: 10
High: 11
Low: 7
Close: 11
Pattern: hammer
";
        assert_eq!(text, expected);
    }

    #[test]
    fn text_dims_unselected_labels() {
        let selection = Selection::new(PatternFilter::Only(PatternTag::Hammer), false);
        let text = render_text(&sample_bars(), selection);
        assert!(text.contains("Filter: hammer"));
        assert!(text.contains("\nDay 1: doji\n"));
        assert!(text.contains("\nDay 3: bullishEngulfing\n"));
        assert!(text.contains("Day 4\nOpen: 10"));
        assert!(!text.contains("Day 2"));
    }

    #[test]
    fn text_hides_unselected_labels_when_highlight_only() {
        let selection = Selection::new(PatternFilter::Only(PatternTag::Hammer), true);
        let text = render_text(&sample_bars(), selection);
        assert!(!text.contains("Day 1"));
        assert!(!text.contains("Day 3"));
        assert!(text.contains("Pattern: hammer"));
        // counts always cover every label
        assert!(text.starts_with("Doji: 1 · Hammer: 1"));
    }

    #[test]
    fn json_report_shape() {
        let bars = sample_bars();
        let patterns = detect(&bars);
        let value = serde_json::to_value(Report::new(&bars, &patterns)).unwrap();

        assert_eq!(value["bars"].as_array().unwrap().len(), 4);
        assert_eq!(value["bars"][2]["close"], 10.2);
        assert_eq!(
            value["patterns"],
            serde_json::json!({ "0": "doji", "2": "bullishEngulfing", "3": "hammer" })
        );
        assert_eq!(value["counts"]["bullishEngulfing"], 1);
        assert_eq!(value["counts"]["invertedHammer"], 0);
    }

    #[test]
    fn malformed_bars_are_labelled_unless_strict() {
        // high < low
        let bars = [Bar::new(0, 10.0, 9.0, 9.5, 10.0)];

        let patterns = build_engine(false).unwrap().scan(&bars).unwrap();
        assert_eq!(patterns.get(0), Some(PatternTag::Hammer));

        assert!(build_engine(true).unwrap().scan(&bars).is_err());
    }
}
