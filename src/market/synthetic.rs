//! # Synthetic Prices
//!
//! $$
//! \ln\frac{S_{t+1}}{S_t} = \Big(\mu-\tfrac{\sigma^2}{2}\Big)\Delta t + \sigma\sqrt{\Delta t}\,z_t
//! $$
//!
//! Deterministic geometric Brownian motion paths used for offline runs.
//! Shocks are standardized to zero sample mean and unit sample variance so the
//! realized drift of a path equals its nominal drift exactly.

use async_trait::async_trait;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Weekday;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

use super::PricePoint;
use super::PriceSource;
use crate::error::AllocError;
use crate::error::Result;

const TRADING_DAYS: f64 = 252.0;

/// Annual drift and volatility of a synthetic path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticProfile {
  pub drift: f64,
  pub volatility: f64,
  /// Crypto pairs trade every calendar day.
  pub trades_weekends: bool,
}

fn seed_for(symbol: &str) -> u64 {
  // FNV-1a
  symbol.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
    (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
  })
}

/// Rough drift/volatility levels per symbol; unknown symbols get a seeded profile.
pub fn profile_for(symbol: &str) -> SyntheticProfile {
  let trades_weekends = symbol.ends_with("-USD");
  let (drift, volatility) = match symbol {
    "AAPL" => (0.22, 0.30),
    "MSFT" => (0.20, 0.27),
    "GOOGL" => (0.15, 0.30),
    "GLD" => (0.07, 0.15),
    "SLV" => (0.05, 0.28),
    "VNQ" => (0.06, 0.22),
    "BND" => (0.03, 0.06),
    "AGG" => (0.03, 0.05),
    "BTC-USD" => (0.45, 0.70),
    "ETH-USD" => (0.50, 0.85),
    "LQD" => (0.035, 0.09),
    "TLT" => (0.02, 0.15),
    "GSG" => (0.04, 0.25),
    "DBC" => (0.045, 0.22),
    _ => {
      let h = seed_for(symbol);
      let u1 = (h % 1000) as f64 / 1000.0;
      let u2 = ((h / 1000) % 1000) as f64 / 1000.0;
      (0.02 + 0.18 * u1, 0.10 + 0.40 * u2)
    }
  };

  SyntheticProfile {
    drift,
    volatility,
    trades_weekends,
  }
}

fn trading_dates(start: NaiveDate, end: NaiveDate, weekends: bool) -> Vec<NaiveDate> {
  start
    .iter_days()
    .take_while(|d| *d < end)
    .filter(|d| weekends || !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
    .collect()
}

/// Generate a daily path for `symbol` on `[start, end)`.
pub fn synthetic_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
  let profile = profile_for(symbol);
  let dates = trading_dates(start, end, profile.trades_weekends);
  if dates.is_empty() {
    return Vec::new();
  }

  let mut rng = StdRng::seed_from_u64(seed_for(symbol));
  let n_steps = dates.len() - 1;
  let mut shocks: Vec<f64> = (0..n_steps).map(|_| rng.sample(StandardNormal)).collect();

  if n_steps >= 2 {
    let mean = shocks.iter().sum::<f64>() / n_steps as f64;
    let var = shocks.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n_steps - 1) as f64;
    let sd = var.sqrt().max(1e-12);
    for z in &mut shocks {
      *z = (*z - mean) / sd;
    }
  }

  let dt = 1.0 / TRADING_DAYS;
  let step_drift = (profile.drift - 0.5 * profile.volatility.powi(2)) * dt;
  let step_vol = profile.volatility * dt.sqrt();

  let mut price = 100.0;
  let mut out = Vec::with_capacity(dates.len());
  out.push(PricePoint {
    date: dates[0],
    close: price,
  });
  for (date, z) in dates[1..].iter().zip(shocks.iter()) {
    price *= (step_drift + step_vol * z).exp();
    out.push(PricePoint {
      date: *date,
      close: price,
    });
  }
  out
}

/// [`PriceSource`] that serves synthetic paths for any symbol.
#[derive(Clone, Debug, Default)]
pub struct SyntheticSource;

#[async_trait]
impl PriceSource for SyntheticSource {
  async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
    Ok(synthetic_series(symbol, start, end))
  }

  async fn probe(&self, symbol: &str) -> Result<usize> {
    if symbol.is_empty() {
      return Err(AllocError::unavailable(symbol, "empty symbol"));
    }
    Ok(21)
  }
}
