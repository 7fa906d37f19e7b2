//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf y \ge 0} \ \mathbf y^\top \Sigma \mathbf y
//! \quad \text{s.t.}\quad (\mu - r_f)^\top \mathbf y = 1,
//! \qquad \mathbf w^\* = \mathbf y / \mathbf 1^\top \mathbf y
//! $$
//!
//! Long-only maximum-Sharpe weights through the equivalent convex quadratic
//! program, solved with a primal active-set method.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;

use super::types::PerformanceSummary;
use crate::error::AllocError;
use crate::error::Result;

const STEP_TOL: f64 = 1e-12;
const DUAL_TOL: f64 = 1e-10;
/// Smallest eigenvalue accepted, relative to the largest.
const PD_RTOL: f64 = 1e-12;

/// Whether `cov` is positive definite beyond rounding noise.
fn is_well_conditioned(cov: &DMatrix<f64>) -> bool {
  let eigenvalues = cov.clone().symmetric_eigen().eigenvalues;
  let largest = eigenvalues.max();
  let smallest = eigenvalues.min();
  largest > 0.0 && smallest > PD_RTOL * cov.nrows() as f64 * largest
}

/// Maximum-Sharpe long-only weights summing to one.
///
/// Fails when the covariance is empty, misshaped or not positive definite, when
/// no asset earns more than `risk_free`, or after `max_iters` active-set steps.
pub fn max_sharpe(
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
  max_iters: usize,
) -> Result<DVector<f64>> {
  let n = mu.len();
  if n == 0 {
    return Err(AllocError::optimization("empty covariance sub-matrix"));
  }
  if cov.nrows() != n || cov.ncols() != n {
    return Err(AllocError::optimization(format!(
      "covariance is {}x{} but there are {n} expected returns",
      cov.nrows(),
      cov.ncols()
    )));
  }
  if cov.iter().chain(mu.iter()).any(|v| !v.is_finite()) {
    return Err(AllocError::optimization("non-finite statistics"));
  }
  if !is_well_conditioned(cov) {
    return Err(AllocError::optimization(
      "covariance sub-matrix is singular or not positive definite",
    ));
  }

  let excess = mu.map(|m| m - risk_free);
  let start = excess
    .iter()
    .enumerate()
    .filter(|(_, e)| **e > 0.0)
    .max_by(|a, b| a.1.total_cmp(b.1))
    .map(|(i, _)| i)
    .ok_or_else(|| {
      AllocError::optimization(format!(
        "no asset has an expected return above the risk-free rate {risk_free}"
      ))
    })?;

  // Feasible start: everything in the best single asset.
  let mut y = DVector::<f64>::zeros(n);
  y[start] = 1.0 / excess[start];
  let mut free = vec![false; n];
  free[start] = true;

  for iter in 0..max_iters {
    let idx: Vec<usize> = (0..n).filter(|&i| free[i]).collect();
    let k = idx.len();
    let grad = cov * &y;

    let mut kkt = DMatrix::<f64>::zeros(k + 1, k + 1);
    let mut rhs = DVector::<f64>::zeros(k + 1);
    for (r, &i) in idx.iter().enumerate() {
      for (c, &j) in idx.iter().enumerate() {
        kkt[(r, c)] = cov[(i, j)];
      }
      kkt[(r, k)] = excess[i];
      kkt[(k, r)] = excess[i];
      rhs[r] = -grad[i];
    }

    let sol = kkt
      .lu()
      .solve(&rhs)
      .ok_or_else(|| AllocError::optimization("singular KKT system"))?;
    let step = sol.rows(0, k);

    if step.amax() <= STEP_TOL * (1.0 + y.amax()) {
      let lambda = -sol[k];
      let worst = (0..n)
        .filter(|&i| !free[i])
        .map(|i| (i, grad[i] - lambda * excess[i]))
        .min_by(|a, b| a.1.total_cmp(&b.1));

      match worst {
        Some((i, z)) if z < -DUAL_TOL * (1.0 + lambda.abs()) => {
          free[i] = true;
        }
        _ => {
          debug!(iterations = iter + 1, active = k, "max-sharpe converged");
          let y = y.map(|v| v.max(0.0));
          let total = y.sum();
          if total <= 0.0 {
            return Err(AllocError::optimization("degenerate solution"));
          }
          return Ok(y / total);
        }
      }
    } else {
      let mut alpha = 1.0;
      let mut blocking = None;
      for (r, &i) in idx.iter().enumerate() {
        if step[r] < 0.0 {
          let t = -y[i] / step[r];
          if t < alpha {
            alpha = t;
            blocking = Some(i);
          }
        }
      }

      for (r, &i) in idx.iter().enumerate() {
        y[i] += alpha * step[r];
      }
      if let Some(i) = blocking {
        y[i] = 0.0;
        free[i] = false;
      }
    }
  }

  Err(AllocError::optimization(format!(
    "active-set solver did not converge in {max_iters} iterations"
  )))
}

/// Zero weights below `cutoff` and renormalize the rest to sum to one.
pub fn clean_weights(weights: &DVector<f64>, cutoff: f64) -> DVector<f64> {
  let kept = weights.map(|w| if w.abs() < cutoff { 0.0 } else { w.max(0.0) });
  let total = kept.sum();
  if total > 0.0 {
    kept / total
  } else {
    weights.clone()
  }
}

/// Return, volatility and Sharpe ratio of `weights`.
pub fn portfolio_performance(
  weights: &DVector<f64>,
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
) -> PerformanceSummary {
  let expected_return = weights.dot(mu);
  let volatility = weights.dot(&(cov * weights)).max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  PerformanceSummary {
    expected_return,
    volatility,
    sharpe,
  }
}
