//! # Configuration
//!
//! Runtime knobs for the allocation engine, loadable from TOML. Every key is
//! optional and falls back to [`AllocatorConfig::default`].

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AllocError;
use crate::error::Result;
use crate::portfolio::MergePolicy;
use crate::portfolio::ReturnsMethod;

/// Runtime configuration for [`crate::portfolio::AllocationEngine`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
  /// Risk-free rate used in Sharpe computations.
  pub risk_free: f64,
  /// Expected-return estimator.
  pub returns_method: ReturnsMethod,
  /// Observations per year used to annualize returns and covariance.
  pub periods_per_year: f64,
  /// Candidate weights below this are zeroed before scaling.
  pub clean_cutoff: f64,
  /// How a new allocation combines with an existing holding of the same symbol.
  pub merge_policy: MergePolicy,
  /// First date (inclusive) of the history window.
  pub history_start: NaiveDate,
  /// Last date (exclusive) of the history window.
  pub history_end: NaiveDate,
  /// Recent window used by the ticker probe, in the data provider's range syntax.
  pub probe_range: String,
  /// Maximum number of ticker probes in flight.
  pub probe_concurrency: usize,
  /// Iteration cap for the max-Sharpe solver.
  pub max_iters: usize,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.02,
      returns_method: ReturnsMethod::Compounded,
      periods_per_year: 252.0,
      clean_cutoff: 1e-4,
      merge_policy: MergePolicy::Sum,
      history_start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
      history_end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
      probe_range: "1mo".to_string(),
      probe_concurrency: 4,
      max_iters: 1000,
    }
  }
}

impl AllocatorConfig {
  /// Parse and validate a TOML document.
  pub fn from_toml_str(text: &str) -> Result<Self> {
    let config: Self = toml::from_str(text).map_err(|e| AllocError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a TOML file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
      .map_err(|e| AllocError::Config(format!("cannot read {}: {e}", path.display())))?;
    Self::from_toml_str(&text)
  }

  /// Check value ranges.
  pub fn validate(&self) -> Result<()> {
    if !self.risk_free.is_finite() {
      return Err(AllocError::Config("risk_free must be finite".into()));
    }
    if !(self.periods_per_year > 0.0 && self.periods_per_year.is_finite()) {
      return Err(AllocError::Config("periods_per_year must be positive".into()));
    }
    if !(0.0..1.0).contains(&self.clean_cutoff) {
      return Err(AllocError::Config("clean_cutoff must be in [0, 1)".into()));
    }
    if self.history_start >= self.history_end {
      return Err(AllocError::Config(format!(
        "history window is empty: {} .. {}",
        self.history_start, self.history_end
      )));
    }
    if self.probe_concurrency == 0 {
      return Err(AllocError::Config("probe_concurrency must be at least 1".into()));
    }
    if self.max_iters == 0 {
      return Err(AllocError::Config("max_iters must be at least 1".into()));
    }
    Ok(())
  }
}
