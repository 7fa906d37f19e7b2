//! # Errors
//!
//! Failure taxonomy shared by input resolution, market data and the
//! allocation engine.

use thiserror::Error;

/// Errors raised while resolving inputs, loading prices or optimizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocError {
  /// A numeric token could not be parsed.
  #[error("could not parse {what} '{token}' (position {position})")]
  Parse {
    what: &'static str,
    token: String,
    position: usize,
  },
  /// Input parsed but violates a structural rule (empty lists, count mismatch, ...).
  #[error("invalid input: {0}")]
  Validation(String),
  /// A symbol has no usable price history in the requested window.
  #[error("no price data for {symbol}: {reason}")]
  DataUnavailable { symbol: String, reason: String },
  /// Degenerate covariance, infeasible constraints or a solver that did not converge.
  #[error("optimization failed: {0}")]
  Optimization(String),
  /// The market-data client itself failed.
  #[error("market data request for {symbol} failed: {message}")]
  Source { symbol: String, message: String },
  /// Configuration file could not be read or holds invalid values.
  #[error("config error: {0}")]
  Config(String),
  /// A report artifact could not be written.
  #[error("output error: {0}")]
  Output(String),
}

impl AllocError {
  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub(crate) fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::DataUnavailable {
      symbol: symbol.into(),
      reason: reason.into(),
    }
  }

  pub(crate) fn optimization(msg: impl Into<String>) -> Self {
    Self::Optimization(msg.into())
  }
}

pub type Result<T> = std::result::Result<T, AllocError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_are_human_readable() {
    let err = AllocError::Parse {
      what: "amount",
      token: "abc".to_string(),
      position: 2,
    };
    assert_eq!(err.to_string(), "could not parse amount 'abc' (position 2)");

    let err = AllocError::unavailable("ZZZZ", "empty series");
    assert_eq!(err.to_string(), "no price data for ZZZZ: empty series");
  }
}
