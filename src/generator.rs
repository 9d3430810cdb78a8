//! Synthetic daily bars
//!
//! A random walk where each bar opens near the previous close, with prices
//! rounded to cents. Useful for demos, benches and property tests.
//!
//! ```rust
//! use candlescope::generator::CandleGenerator;
//!
//! let bars = CandleGenerator::new().count(30).seed(7).generate().unwrap();
//! assert_eq!(bars.len(), 30);
//! assert!(bars.iter().all(|b| b.low <= b.open.min(b.close)));
//! ```

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Bar, PatternError, Result};

pub const DEFAULT_COUNT: usize = 150;
pub const DEFAULT_START_PRICE: f64 = 100.0;

/// Round to two decimal places
#[inline]
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Builder for a synthetic bar series
#[derive(Debug, Clone, Copy)]
pub struct CandleGenerator {
    count: usize,
    start_price: f64,
    seed: Option<u64>,
}

impl Default for CandleGenerator {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            start_price: DEFAULT_START_PRICE,
            seed: None,
        }
    }
}

impl CandleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bars to produce
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Close the walk starts from
    pub fn start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    /// Fix the seed for a reproducible series
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate with a seeded `StdRng` if a seed was set, else the thread rng
    pub fn generate(&self) -> Result<Vec<Bar>> {
        match self.seed {
            Some(seed) => self.generate_with(&mut StdRng::seed_from_u64(seed)),
            None => self.generate_with(&mut rand::rng()),
        }
    }

    /// Generate drawing from the given rng
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> Result<Vec<Bar>> {
        if !self.start_price.is_finite() {
            return Err(PatternError::InvalidValue(
                "start price cannot be NaN or infinite",
            ));
        }

        let mut bars = Vec::with_capacity(self.count);
        let mut last_close = self.start_price;

        for i in 0..self.count {
            let volatility = 2.0 + rng.random::<f64>() * 3.0;

            let open = round2(last_close + (rng.random::<f64>() - 0.5) * volatility);
            let close = round2(open + (rng.random::<f64>() - 0.5) * volatility * 2.0);
            let high = round2(open.max(close) + round2(rng.random::<f64>() * volatility));
            let low = round2(open.min(close) - round2(rng.random::<f64>() * volatility));

            bars.push(Bar::new(i as i64, open, high, low, close));
            last_close = close;
        }

        tracing::debug!(
            count = bars.len(),
            start_price = self.start_price,
            last_close,
            "generated candles"
        );
        tracing::trace!(?bars, "generated candle data");

        Ok(bars)
    }
}

/// `count` bars starting from `start_price`, unseeded
pub fn generate_random_candles(count: usize, start_price: f64) -> Result<Vec<Bar>> {
    CandleGenerator::new()
        .count(count)
        .start_price(start_price)
        .generate()
}
