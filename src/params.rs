//! Parameter metadata for pattern detectors
//!
//! This module provides metadata about detector thresholds, enabling:
//! - Threshold sweeps (grid generation)
//! - Parameter documentation
//! - Construction of detectors from a key/value map
//!
//! # Example
//!
//! ```rust
//! use candlescope::params::{ParamMeta, ParamType, ParameterizedDetector};
//! use candlescope::prelude::*;
//!
//! // Get parameter metadata for a detector
//! let params = HammerDetector::param_meta();
//! for param in params {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{
  detectors::{
    check_factor, DojiDetector, EngulfingDetector, HammerDetector, InvertedHammerDetector,
    DOJI_RATIO, SHADOW_SHORT_FACTOR, SHADOW_VERYLONG_FACTOR,
  },
  PatternError, Ratio, Result,
};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Multiplier applied to the bar's body (non-negative, may exceed 1.0)
  Factor,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "max_body_ratio")
  pub name: &'static str,
  /// Parameter type (Ratio or Factor)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for sweeps: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Factor parameter
  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for a sweep
  ///
  /// A non-positive or non-finite step yields just `min`.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 || !step.is_finite() {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if value.is_nan() {
      return Err(PatternError::InvalidValue("parameter cannot be NaN"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Factor => check_factor(self.name, value),
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Trait for detectors that support parameterization
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Returns the detector name
  fn pattern_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a body factor from params with default fallback
pub fn get_factor(params: &HashMap<&str, f64>, key: &'static str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  check_factor(key, value)?;
  Ok(value)
}

// ============================================================
// DETECTOR PARAMETERS
// ============================================================

static DOJI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
  "max_body_ratio",
  DOJI_RATIO,
  (0.02, 0.3, 0.02),
  "Largest body, as a share of the range, that still counts as a doji",
)];

static HAMMER_PARAMS: &[ParamMeta] = &[
  ParamMeta::factor(
    "shadow_verylong_factor",
    SHADOW_VERYLONG_FACTOR,
    (1.0, 4.0, 0.5),
    "Lower shadow must exceed body times this factor",
  ),
  ParamMeta::factor(
    "shadow_short_factor",
    SHADOW_SHORT_FACTOR,
    (0.0, 1.0, 0.1),
    "Upper shadow may not exceed body times this factor",
  ),
];

static INVERTED_HAMMER_PARAMS: &[ParamMeta] = &[
  ParamMeta::factor(
    "shadow_verylong_factor",
    SHADOW_VERYLONG_FACTOR,
    (1.0, 4.0, 0.5),
    "Upper shadow must exceed body times this factor",
  ),
  ParamMeta::factor(
    "shadow_short_factor",
    SHADOW_SHORT_FACTOR,
    (0.0, 1.0, 0.1),
    "Lower shadow may not exceed body times this factor",
  ),
];

impl ParameterizedDetector for DojiDetector {
  fn param_meta() -> &'static [ParamMeta] {
    DOJI_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self { max_body_ratio: get_ratio(params, "max_body_ratio", DOJI_RATIO)? })
  }

  fn pattern_name() -> &'static str {
    "doji"
  }
}

impl ParameterizedDetector for HammerDetector {
  fn param_meta() -> &'static [ParamMeta] {
    HAMMER_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self {
      shadow_verylong_factor: get_factor(params, "shadow_verylong_factor", SHADOW_VERYLONG_FACTOR)?,
      shadow_short_factor: get_factor(params, "shadow_short_factor", SHADOW_SHORT_FACTOR)?,
    })
  }

  fn pattern_name() -> &'static str {
    "hammer"
  }
}

impl ParameterizedDetector for InvertedHammerDetector {
  fn param_meta() -> &'static [ParamMeta] {
    INVERTED_HAMMER_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self {
      shadow_verylong_factor: get_factor(params, "shadow_verylong_factor", SHADOW_VERYLONG_FACTOR)?,
      shadow_short_factor: get_factor(params, "shadow_short_factor", SHADOW_SHORT_FACTOR)?,
    })
  }

  fn pattern_name() -> &'static str {
    "inverted_hammer"
  }
}

impl ParameterizedDetector for EngulfingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    &[]
  }

  fn with_params(_params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self)
  }

  fn pattern_name() -> &'static str {
    "engulfing"
  }
}

// ============================================================
// TESTS
// ============================================================
