//! # Ticker Validator
//!
//! Availability probe: a symbol is valid iff a short-window fetch succeeds with
//! at least one observation. Probes fan out with a fixed concurrency bound.

use futures::StreamExt;
use futures::stream;
use tracing::debug;
use tracing::warn;

use super::PriceSource;

/// Outcome of probing a list of symbols. Both lists keep input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
  pub valid: Vec<String>,
  pub invalid: Vec<String>,
}

impl ValidationReport {
  pub fn all_valid(&self) -> bool {
    self.invalid.is_empty()
  }
}

/// Probe each symbol, at most `concurrency` requests in flight.
pub async fn validate_symbols<S>(source: &S, symbols: &[String], concurrency: usize) -> ValidationReport
where
  S: PriceSource + ?Sized,
{
  let mut outcomes: Vec<(usize, bool)> = stream::iter(symbols.iter().enumerate())
    .map(|(idx, symbol)| async move {
      let ok = match source.probe(symbol).await {
        Ok(n) if n > 0 => {
          debug!(symbol = %symbol, observations = n, "probe ok");
          true
        }
        Ok(_) => {
          warn!(symbol = %symbol, "probe returned no observations");
          false
        }
        Err(err) => {
          warn!(symbol = %symbol, error = %err, "probe failed");
          false
        }
      };
      (idx, ok)
    })
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

  outcomes.sort_by_key(|(idx, _)| *idx);

  let mut report = ValidationReport::default();
  for (idx, ok) in outcomes {
    let symbol = symbols[idx].clone();
    if ok {
      report.valid.push(symbol);
    } else {
      report.invalid.push(symbol);
    }
  }
  report
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use tracing_test::traced_test;

  use super::*;
  use crate::market::StaticSource;

  #[test]
  #[traced_test]
  fn invalid_symbols_are_separated_and_logged() {
    let source = StaticSource::synthetic(
      ["AAPL", "MSFT"],
      NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
      NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
    );
    let symbols: Vec<String> = ["AAPL", "ZZZZINVALID", "MSFT"]
      .iter()
      .map(|s| s.to_string())
      .collect();

    let report = tokio_test::block_on(validate_symbols(&source, &symbols, 2));

    assert_eq!(report.valid, vec!["AAPL".to_string(), "MSFT".to_string()]);
    assert_eq!(report.invalid, vec!["ZZZZINVALID".to_string()]);
    assert!(!report.all_valid());
    assert!(logs_contain("probe failed"));
  }

  #[test]
  fn empty_input_probes_nothing() {
    let source = StaticSource::new();
    let report = tokio_test::block_on(validate_symbols(&source, &[], 4));

    assert!(report.valid.is_empty() && report.invalid.is_empty());
    assert_eq!(source.calls(), 0);
  }
}
