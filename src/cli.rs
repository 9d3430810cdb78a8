use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use candlescope::generator::{CandleGenerator, DEFAULT_COUNT, DEFAULT_START_PRICE};
use candlescope::render::{PatternFilter, Selection};
use candlescope::Bar;

#[derive(Parser, Debug)]
#[command(
    name = "candlescope",
    about = "Label daily price bars with candlestick patterns"
)]
pub struct Cli {
    /// JSON array of bars ({"time", "open", "high", "low", "close"}).
    ///
    /// When omitted, a random series is generated instead.
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Number of bars to generate
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// Close the generated walk starts from
    #[arg(long = "start-price", default_value_t = DEFAULT_START_PRICE)]
    pub start_price: f64,

    /// Seed for a reproducible generated series
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pattern in focus: "all" or a tag such as "hammer" or "bullishEngulfing"
    #[arg(long, default_value = "all")]
    pub filter: PatternFilter,

    /// Hide labelled bars outside the filter
    #[arg(long = "highlight-only", default_value_t = false)]
    pub highlight_only: bool,

    /// Reject bars that break the OHLC invariants instead of labelling them
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn load_bars(&self) -> Result<Vec<Bar>> {
        match &self.input {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("failed to parse bars from {}", path.display()))
            }
            None => {
                let mut generator = CandleGenerator::new()
                    .count(self.count)
                    .start_price(self.start_price);
                if let Some(seed) = self.seed {
                    generator = generator.seed(seed);
                }
                generator
                    .generate()
                    .context("failed to generate candles")
            }
        }
    }

    pub fn selection(&self) -> Selection {
        Selection::new(self.filter, self.highlight_only)
    }
}
