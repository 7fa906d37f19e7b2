//! # Price Table
//!
//! $$
//! P \in \mathbb R^{T\times N},\quad P_{t,i} = \text{adjusted close of asset } i \text{ on date } t
//! $$
//!
//! Aligns per-symbol histories on a shared date index.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use nalgebra::DMatrix;

use super::PricePoint;
use crate::error::AllocError;
use crate::error::Result;

/// Adjusted closes of several symbols aligned on one date index.
///
/// Rows are dates, columns follow `symbols`. Dates are the union of every
/// series' dates starting from the first date on which all symbols trade;
/// interior gaps carry the last observed price forward.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceTable {
  symbols: Vec<String>,
  dates: Vec<NaiveDate>,
  prices: DMatrix<f64>,
}

impl PriceTable {
  /// Align raw histories. Fails if a series is empty or fewer than two rows survive.
  pub fn from_series(series: Vec<(String, Vec<PricePoint>)>) -> Result<Self> {
    if series.is_empty() {
      return Err(AllocError::validation("no symbols to build a price table from"));
    }

    let mut cleaned = Vec::with_capacity(series.len());
    for (symbol, mut points) in series {
      points.retain(|p| p.close.is_finite() && p.close > 0.0);
      points.sort_by_key(|p| p.date);
      points.dedup_by_key(|p| p.date);
      if points.is_empty() {
        return Err(AllocError::unavailable(symbol, "no observations in window"));
      }
      cleaned.push((symbol, points));
    }

    let common_start = cleaned
      .iter()
      .map(|(_, points)| points[0].date)
      .max()
      .unwrap_or(NaiveDate::MIN);

    let dates: Vec<NaiveDate> = cleaned
      .iter()
      .flat_map(|(_, points)| points.iter().map(|p| p.date))
      .filter(|d| *d >= common_start)
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    if dates.len() < 2 {
      let names: Vec<&str> = cleaned.iter().map(|(s, _)| s.as_str()).collect();
      return Err(AllocError::unavailable(
        names.join(","),
        "fewer than two overlapping observations",
      ));
    }

    let mut prices = DMatrix::<f64>::zeros(dates.len(), cleaned.len());
    for (col, (_, points)) in cleaned.iter().enumerate() {
      let mut cursor = 0;
      let mut last = points[0].close;
      for (row, date) in dates.iter().enumerate() {
        while cursor < points.len() && points[cursor].date <= *date {
          last = points[cursor].close;
          cursor += 1;
        }
        prices[(row, col)] = last;
      }
    }

    Ok(Self {
      symbols: cleaned.into_iter().map(|(s, _)| s).collect(),
      dates,
      prices,
    })
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// Price matrix, one row per date.
  pub fn prices(&self) -> &DMatrix<f64> {
    &self.prices
  }

  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn p(date: NaiveDate, close: f64) -> PricePoint {
    PricePoint { date, close }
  }

  #[test]
  fn forward_fills_gaps_and_trims_leading_dates() {
    let crypto = vec![
      p(d(2024, 1, 5), 10.0),
      p(d(2024, 1, 6), 11.0),
      p(d(2024, 1, 7), 12.0),
      p(d(2024, 1, 8), 13.0),
    ];
    let stock = vec![p(d(2024, 1, 6), 100.0), p(d(2024, 1, 8), 102.0)];

    let table =
      PriceTable::from_series(vec![("BTC-USD".into(), crypto), ("AAPL".into(), stock)]).unwrap();

    assert_eq!(table.dates(), &[d(2024, 1, 6), d(2024, 1, 7), d(2024, 1, 8)]);
    let column = |symbol: &str| -> Vec<f64> {
      let c = table.symbols().iter().position(|s| s == symbol).unwrap();
      table.prices().column(c).iter().copied().collect()
    };
    assert_eq!(column("AAPL"), vec![100.0, 100.0, 102.0]);
    assert_eq!(column("BTC-USD"), vec![11.0, 12.0, 13.0]);
  }

  #[test]
  fn empty_series_is_unavailable() {
    let err = PriceTable::from_series(vec![
      ("GLD".into(), vec![p(d(2024, 1, 1), 1.0), p(d(2024, 1, 2), 1.1)]),
      ("NOPE".into(), Vec::new()),
    ])
    .unwrap_err();

    assert!(matches!(err, AllocError::DataUnavailable { ref symbol, .. } if symbol == "NOPE"));
  }

  #[test]
  fn non_positive_prices_are_dropped() {
    let table = PriceTable::from_series(vec![(
      "GLD".into(),
      vec![
        p(d(2024, 1, 1), 1.0),
        p(d(2024, 1, 2), f64::NAN),
        p(d(2024, 1, 3), 0.0),
        p(d(2024, 1, 4), 1.2),
      ],
    )])
    .unwrap();

    assert_eq!(table.n_dates(), 2);
  }
}
