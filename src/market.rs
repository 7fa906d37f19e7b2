//! # Market Data
//!
//! Price-source abstraction, an in-memory source and the aligned price table
//! consumed by the allocation engine.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::error::AllocError;
use crate::error::Result;

pub mod synthetic;
pub mod table;
pub mod validator;
#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use synthetic::SyntheticSource;
pub use table::PriceTable;
pub use validator::ValidationReport;
pub use validator::validate_symbols;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooSource;

/// One adjusted closing price.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
  pub date: NaiveDate,
  pub close: f64,
}

/// Client able to return adjusted closing prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
  /// Daily adjusted closes for `symbol` on `[start, end)`.
  async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>>;

  /// Number of observations over a short recent window. Used as an availability check.
  async fn probe(&self, symbol: &str) -> Result<usize>;
}

/// Fetch every symbol's history sequentially and align them.
///
/// Any symbol without observations aborts with [`AllocError::DataUnavailable`].
pub async fn fetch_price_table<S>(
  source: &S,
  symbols: &[String],
  start: NaiveDate,
  end: NaiveDate,
) -> Result<PriceTable>
where
  S: PriceSource + ?Sized,
{
  let mut series = Vec::with_capacity(symbols.len());
  for symbol in symbols {
    let points = source.history(symbol, start, end).await?;
    debug!(symbol = %symbol, observations = points.len(), "fetched history");
    if points.is_empty() {
      return Err(AllocError::unavailable(
        symbol.clone(),
        format!("no observations between {start} and {end}"),
      ));
    }
    series.push((symbol.clone(), points));
  }

  PriceTable::from_series(series)
}

/// In-memory [`PriceSource`] keyed by symbol. Unknown symbols are unavailable.
#[derive(Debug, Default)]
pub struct StaticSource {
  series: HashMap<String, Vec<PricePoint>>,
  calls: AtomicUsize,
}

impl StaticSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_series(mut self, symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
    self.series.insert(symbol.into(), points);
    self
  }

  /// Source holding a synthetic path for each of `symbols` over `[start, end)`.
  pub fn synthetic<I, S>(symbols: I, start: NaiveDate, end: NaiveDate) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    symbols.into_iter().fold(Self::new(), |source, symbol| {
      let symbol = symbol.as_ref();
      source.with_series(symbol, synthetic::synthetic_series(symbol, start, end))
    })
  }

  /// Total number of `history` and `probe` calls served.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn lookup(&self, symbol: &str) -> Result<&Vec<PricePoint>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .series
      .get(symbol)
      .ok_or_else(|| AllocError::unavailable(symbol, "unknown symbol"))
  }
}

#[async_trait]
impl PriceSource for StaticSource {
  async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
    Ok(
      self
        .lookup(symbol)?
        .iter()
        .filter(|p| p.date >= start && p.date < end)
        .copied()
        .collect(),
    )
  }

  async fn probe(&self, symbol: &str) -> Result<usize> {
    let n = self.lookup(symbol)?.len().min(31);
    if n == 0 {
      return Err(AllocError::unavailable(symbol, "empty probe window"));
    }
    Ok(n)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn fetch_aligns_known_symbols() {
    let source = StaticSource::synthetic(["GLD", "BTC-USD"], d(2023, 1, 1), d(2023, 3, 1));
    let symbols = vec!["GLD".to_string(), "BTC-USD".to_string()];

    let table =
      tokio_test::block_on(fetch_price_table(&source, &symbols, d(2023, 1, 1), d(2023, 3, 1)))
        .unwrap();

    assert_eq!(table.symbols(), symbols.as_slice());
    assert!(table.n_dates() > 40);
    assert_eq!(source.calls(), 2);
  }

  #[test]
  fn fetch_fails_on_window_without_data() {
    let source = StaticSource::synthetic(["GLD"], d(2023, 1, 1), d(2023, 3, 1));
    let symbols = vec!["GLD".to_string()];

    let err =
      tokio_test::block_on(fetch_price_table(&source, &symbols, d(2019, 1, 1), d(2020, 1, 1)))
        .unwrap_err();

    assert!(matches!(err, AllocError::DataUnavailable { .. }));
  }

  #[test]
  fn unknown_symbol_probe_fails() {
    let source = StaticSource::new();
    assert!(tokio_test::block_on(source.probe("ZZZZINVALID")).is_err());
  }
}
