//! Candlestick pattern detectors
//!
//! # Pattern Categories
//!
//! - **Single-bar (3)**: Doji, Hammer, Inverted Hammer
//! - **Two-bar (1)**: Engulfing (bullish and bearish)

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use single_bar::*;
pub use two_bar::*;
