//! # Portfolio Data Utilities
//!
//! $$
//! \mu_i = \Big(\frac{P_{T,i}}{P_{0,i}}\Big)^{f/n}-1,\qquad
//! \Sigma_{ij} = \frac{f}{n-1}\sum_t (r_{t,i}-\bar r_i)(r_{t,j}-\bar r_j)
//! $$
//!
//! Return preprocessing and expected-return / covariance estimation.

use nalgebra::DMatrix;
use nalgebra::DVector;

use super::types::ReturnsMethod;
use crate::error::AllocError;
use crate::error::Result;
use crate::market::PriceTable;

fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

/// Simple periodic returns `p_t / p_{t-1} - 1`, one row per period.
pub fn simple_returns(prices: &DMatrix<f64>) -> DMatrix<f64> {
  let rows = prices.nrows().saturating_sub(1);
  DMatrix::from_fn(rows, prices.ncols(), |r, c| {
    let prev = prices[(r, c)];
    if prev > 0.0 {
      prices[(r + 1, c)] / prev - 1.0
    } else {
      0.0
    }
  })
}

/// Annualized expected return per column of a price matrix.
pub fn expected_returns(
  prices: &DMatrix<f64>,
  method: ReturnsMethod,
  periods_per_year: f64,
) -> DVector<f64> {
  let n_returns = prices.nrows().saturating_sub(1);
  if n_returns == 0 {
    return DVector::zeros(prices.ncols());
  }

  match method {
    ReturnsMethod::Compounded => DVector::from_fn(prices.ncols(), |c, _| {
      let first = prices[(0, c)];
      let last = prices[(n_returns, c)];
      if first > 0.0 {
        (last / first).powf(periods_per_year / n_returns as f64) - 1.0
      } else {
        0.0
      }
    }),
    ReturnsMethod::Arithmetic => {
      let returns = simple_returns(prices);
      DVector::from_fn(returns.ncols(), |c, _| {
        let col: Vec<f64> = returns.column(c).iter().copied().collect();
        sample_mean(&col) * periods_per_year
      })
    }
  }
}

/// Annualized sample covariance (ddof = 1) of periodic returns.
pub fn sample_covariance(returns: &DMatrix<f64>, periods_per_year: f64) -> DMatrix<f64> {
  let rows = returns.nrows();
  let cols = returns.ncols();
  if rows < 2 {
    return DMatrix::zeros(cols, cols);
  }

  let means: Vec<f64> = (0..cols)
    .map(|c| returns.column(c).sum() / rows as f64)
    .collect();

  let mut cov = DMatrix::<f64>::zeros(cols, cols);
  for i in 0..cols {
    for j in i..cols {
      let mut acc = 0.0;
      for r in 0..rows {
        acc += (returns[(r, i)] - means[i]) * (returns[(r, j)] - means[j]);
      }
      let v = acc / (rows - 1) as f64 * periods_per_year;
      cov[(i, j)] = v;
      cov[(j, i)] = v;
    }
  }
  cov
}

/// Expected returns and covariance sharing one symbol ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetStatistics {
  symbols: Vec<String>,
  mu: DVector<f64>,
  cov: DMatrix<f64>,
}

impl AssetStatistics {
  pub fn new(symbols: Vec<String>, mu: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
    let n = symbols.len();
    if mu.len() != n || cov.nrows() != n || cov.ncols() != n {
      return Err(AllocError::optimization(format!(
        "statistics misaligned: {n} symbols, {} returns, {}x{} covariance",
        mu.len(),
        cov.nrows(),
        cov.ncols()
      )));
    }
    Ok(Self { symbols, mu, cov })
  }

  /// Estimate from an aligned price table.
  pub fn from_prices(
    table: &PriceTable,
    method: ReturnsMethod,
    periods_per_year: f64,
  ) -> Result<Self> {
    let prices = table.prices();
    let mu = expected_returns(prices, method, periods_per_year);
    let cov = sample_covariance(&simple_returns(prices), periods_per_year);
    Self::new(table.symbols().to_vec(), mu, cov)
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn mu(&self) -> &DVector<f64> {
    &self.mu
  }

  pub fn cov(&self) -> &DMatrix<f64> {
    &self.cov
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn index_of(&self, symbol: &str) -> Option<usize> {
    self.symbols.iter().position(|s| s == symbol)
  }

  /// Restrict to `symbols`, in the order given.
  pub fn subset(&self, symbols: &[String]) -> Result<Self> {
    let idx = symbols
      .iter()
      .map(|s| {
        self
          .index_of(s)
          .ok_or_else(|| AllocError::unavailable(s.clone(), "missing from price statistics"))
      })
      .collect::<Result<Vec<usize>>>()?;

    let mu = DVector::from_fn(idx.len(), |i, _| self.mu[idx[i]]);
    let cov = DMatrix::from_fn(idx.len(), idx.len(), |i, j| self.cov[(idx[i], idx[j])]);
    Self::new(symbols.to_vec(), mu, cov)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn prices() -> DMatrix<f64> {
    DMatrix::from_row_slice(4, 2, &[100.0, 50.0, 110.0, 49.0, 99.0, 51.0, 121.0, 52.0])
  }

  #[test]
  fn simple_returns_are_period_over_period() {
    let r = simple_returns(&prices());

    assert_eq!(r.nrows(), 3);
    assert_relative_eq!(r[(0, 0)], 0.1, epsilon = 1e-12);
    assert_relative_eq!(r[(1, 0)], -0.1, epsilon = 1e-12);
    assert_relative_eq!(r[(0, 1)], -0.02, epsilon = 1e-12);
  }

  #[test]
  fn compounded_return_annualizes_total_growth() {
    let mu = expected_returns(&prices(), ReturnsMethod::Compounded, 3.0);

    assert_relative_eq!(mu[0], 0.21, epsilon = 1e-12);
    assert_relative_eq!(mu[1], 0.04, epsilon = 1e-12);
  }

  #[test]
  fn arithmetic_return_scales_mean() {
    let mu = expected_returns(&prices(), ReturnsMethod::Arithmetic, 252.0);
    let r = simple_returns(&prices());
    let mean0 = r.column(0).sum() / 3.0;

    assert_relative_eq!(mu[0], mean0 * 252.0, epsilon = 1e-12);
  }

  #[test]
  fn covariance_is_symmetric_with_unbiased_variance() {
    let r = DMatrix::from_row_slice(3, 2, &[0.01, 0.02, -0.01, 0.0, 0.03, -0.02]);
    let cov = sample_covariance(&r, 1.0);

    // var of [0.01, -0.01, 0.03]: mean 0.01, ss = 0 + 0.0004 + 0.0004
    assert_relative_eq!(cov[(0, 0)], 0.0004, epsilon = 1e-15);
    assert_relative_eq!(cov[(0, 1)], cov[(1, 0)], epsilon = 1e-15);
  }

  #[test]
  fn subset_keeps_rows_and_columns_aligned() {
    let stats = AssetStatistics::new(
      vec!["A".into(), "B".into(), "C".into()],
      DVector::from_vec(vec![0.1, 0.2, 0.3]),
      DMatrix::from_row_slice(3, 3, &[1.0, 0.1, 0.2, 0.1, 2.0, 0.3, 0.2, 0.3, 3.0]),
    )
    .unwrap();

    let sub = stats.subset(&["C".into(), "A".into()]).unwrap();

    assert_eq!(sub.mu().as_slice(), &[0.3, 0.1]);
    assert_eq!(sub.cov()[(0, 0)], 3.0);
    assert_eq!(sub.cov()[(0, 1)], 0.2);
    assert!(stats.subset(&["Z".into()]).is_err());
  }

  #[test]
  fn misaligned_statistics_are_rejected() {
    let err = AssetStatistics::new(
      vec!["A".into()],
      DVector::from_vec(vec![0.1, 0.2]),
      DMatrix::zeros(2, 2),
    );
    assert!(err.is_err());
  }
}
