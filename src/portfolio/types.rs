//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\ge 0,\ \mathbf 1^\top\mathbf w=1} \frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Shared enums and result containers for the allocation engine.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::AllocError;

/// How per-asset expected returns are estimated from prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnsMethod {
  /// Compound annual growth rate between the first and last price.
  #[default]
  Compounded,
  /// Arithmetic mean of periodic returns scaled by the periods per year.
  Arithmetic,
}

impl FromStr for ReturnsMethod {
  type Err = AllocError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "compounded" | "cagr" | "geometric" => Ok(Self::Compounded),
      "arithmetic" | "mean" => Ok(Self::Arithmetic),
      other => Err(AllocError::Config(format!("unknown returns method '{other}'"))),
    }
  }
}

/// Rule for combining an existing holding with a new allocation to the same symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
  /// Add the new allocation to the existing amount.
  #[default]
  Sum,
  /// Replace the existing amount with the new allocation.
  Overwrite,
}

impl FromStr for MergePolicy {
  type Err = AllocError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "sum" | "add" => Ok(Self::Sum),
      "overwrite" | "replace" => Ok(Self::Overwrite),
      other => Err(AllocError::Config(format!("unknown merge policy '{other}'"))),
    }
  }
}

/// Expected return, volatility and Sharpe ratio of one weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceSummary {
  /// Model expected portfolio return (annualized).
  pub expected_return: f64,
  /// Model portfolio volatility (annualized).
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`, zero when volatility vanishes.
  pub sharpe: f64,
}

/// Ordered symbol to value mapping. Used for weights as well as dollar amounts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolValues {
  entries: Vec<(String, f64)>,
}

impl SymbolValues {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from pairs. A repeated symbol keeps its first position and its last value.
  pub fn from_pairs<I, S>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    let mut out = Self::new();
    for (symbol, value) in pairs {
      out.set(symbol, value);
    }
    out
  }

  pub fn get(&self, symbol: &str) -> Option<f64> {
    self
      .entries
      .iter()
      .find(|(s, _)| s == symbol)
      .map(|(_, v)| *v)
  }

  /// Insert or replace the value for `symbol`.
  pub fn set(&mut self, symbol: impl Into<String>, value: f64) {
    let symbol = symbol.into();
    match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((symbol, value)),
    }
  }

  /// Add `value` to the amount already stored for `symbol`.
  pub fn add(&mut self, symbol: impl Into<String>, value: f64) {
    let symbol = symbol.into();
    match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
      Some(entry) => entry.1 += value,
      None => self.entries.push((symbol, value)),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.entries.iter().map(|(s, v)| (s.as_str(), *v))
  }

  pub fn symbols(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(s, _)| s.as_str())
  }

  pub fn total(&self) -> f64 {
    self.entries.iter().map(|(_, v)| v).sum()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Multiply every value by `factor`.
  pub fn scaled(&self, factor: f64) -> Self {
    Self {
      entries: self
        .entries
        .iter()
        .map(|(s, v)| (s.clone(), v * factor))
        .collect(),
    }
  }
}

impl fmt::Display for SymbolValues {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .entries
      .iter()
      .map(|(s, v)| format!("{s}: {v:.4}"))
      .collect();
    write!(f, "{{{}}}", parts.join(", "))
  }
}

/// Everything one allocation run produces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationOutcome {
  /// Cleaned max-Sharpe weights over the candidate set.
  pub candidate_weights: SymbolValues,
  /// Dollar amount per candidate, summing to the additional investment.
  pub allocation: SymbolValues,
  /// Holdings merged with the allocation, in dollars.
  pub merged: SymbolValues,
  /// Normalized merged amounts over every priced symbol.
  pub blended_weights: SymbolValues,
  /// Performance of the candidate-only portfolio.
  pub candidate_performance: PerformanceSummary,
  /// Performance of the blended portfolio.
  pub performance: PerformanceSummary,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn symbol_values_keep_insertion_order() {
    let mut values = SymbolValues::from_pairs([("GLD", 1.0), ("BND", 2.0)]);
    values.add("GLD", 0.5);
    values.set("VNQ", 3.0);

    let symbols: Vec<&str> = values.symbols().collect();
    assert_eq!(symbols, vec!["GLD", "BND", "VNQ"]);
    assert_eq!(values.get("GLD"), Some(1.5));
    assert_eq!(values.total(), 6.5);
  }

  #[test]
  fn policies_parse_from_text() {
    assert_eq!("SUM".parse::<MergePolicy>(), Ok(MergePolicy::Sum));
    assert_eq!("overwrite".parse::<MergePolicy>(), Ok(MergePolicy::Overwrite));
    assert!("median".parse::<MergePolicy>().is_err());
    assert_eq!("mean".parse::<ReturnsMethod>(), Ok(ReturnsMethod::Arithmetic));
  }
}
