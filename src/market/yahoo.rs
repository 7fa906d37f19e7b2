//! # Yahoo Finance
//!
//! [`PriceSource`] backed by the Yahoo Finance chart API.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use super::PricePoint;
use super::PriceSource;
use crate::error::AllocError;
use crate::error::Result;

/// Yahoo Finance client. Probes use daily bars over `probe_range` (e.g. `1mo`).
pub struct YahooSource {
  connector: yahoo::YahooConnector,
  probe_range: String,
}

impl YahooSource {
  pub fn new(probe_range: impl Into<String>) -> Result<Self> {
    let connector = yahoo::YahooConnector::new().map_err(|e| AllocError::Source {
      symbol: "*".to_string(),
      message: e.to_string(),
    })?;

    Ok(Self {
      connector,
      probe_range: probe_range.into(),
    })
  }
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
  let ts = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
  OffsetDateTime::from_unix_timestamp(ts)
    .map_err(|e| AllocError::Config(format!("date {date} out of range: {e}")))
}

/// Yahoo answers unknown or delisted symbols with a 404 or an empty chart.
fn is_missing_symbol(message: &str) -> bool {
  let message = message.to_lowercase();
  ["404", "not found", "no data", "empty data"]
    .iter()
    .any(|needle| message.contains(needle))
}

fn request_error(symbol: &str, err: yahoo::YahooError) -> AllocError {
  let message = err.to_string();
  if is_missing_symbol(&message) {
    AllocError::unavailable(symbol, message)
  } else {
    AllocError::Source {
      symbol: symbol.to_string(),
      message,
    }
  }
}

fn to_points(quotes: &[yahoo::Quote]) -> Vec<PricePoint> {
  quotes
    .iter()
    .filter_map(|q| {
      let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
      let close = if q.adjclose.is_finite() && q.adjclose > 0.0 {
        q.adjclose
      } else {
        q.close
      };
      Some(PricePoint { date, close })
    })
    .collect()
}

#[async_trait]
impl PriceSource for YahooSource {
  async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
    let response = self
      .connector
      .get_quote_history(symbol, to_offset(start)?, to_offset(end)?)
      .await
      .map_err(|e| request_error(symbol, e))?;

    let quotes = response
      .quotes()
      .map_err(|e| AllocError::unavailable(symbol, e.to_string()))?;
    debug!(symbol, quotes = quotes.len(), "yahoo history");

    Ok(to_points(&quotes))
  }

  async fn probe(&self, symbol: &str) -> Result<usize> {
    let response = self
      .connector
      .get_quote_range(symbol, "1d", &self.probe_range)
      .await
      .map_err(|e| request_error(symbol, e))?;

    let quotes = response
      .quotes()
      .map_err(|e| AllocError::unavailable(symbol, e.to_string()))?;

    Ok(quotes.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_convert_to_utc_midnight() {
    let date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    let odt = to_offset(date).unwrap();

    assert_eq!(odt.unix_timestamp(), 1_514_764_800);
  }

  #[test]
  fn not_found_responses_mean_missing_symbol() {
    assert!(is_missing_symbol("fetching the data from yahoo! finance failed: 404 Not Found"));
    assert!(is_missing_symbol("Yahoo returned an empty data set"));
    assert!(!is_missing_symbol("connection to yahoo! finance server failed: timed out"));
  }
}
