//! # Allocation Engine
//!
//! $$
//! \mathbf a = I\,\mathbf w^\*_{\text{alt}},\qquad
//! \mathbf w_{\text{blend}} = \frac{\mathbf h \oplus \mathbf a}{\mathbf 1^\top(\mathbf h \oplus \mathbf a)}
//! $$
//!
//! High-level orchestration: probe holdings, fetch prices, solve max-Sharpe
//! over the candidates, scale by the new investment and score the blend.

use nalgebra::DVector;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::data::AssetStatistics;
use super::optimizers::clean_weights;
use super::optimizers::max_sharpe;
use super::optimizers::portfolio_performance;
use super::types::AllocationOutcome;
use super::types::MergePolicy;
use super::types::SymbolValues;
use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::error::Result;
use crate::input::CandidateSet;
use crate::input::Holdings;
use crate::market::PriceSource;
use crate::market::PriceTable;
use crate::market::ValidationReport;
use crate::market::fetch_price_table;
use crate::market::validate_symbols;

/// One request: current positions, alternatives to consider and the amount to add.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationRequest {
  pub holdings: Holdings,
  pub candidates: CandidateSet,
  pub additional_investment: f64,
}

/// Result of a full run, including the symbols dropped by the ticker probe.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
  pub validation: ValidationReport,
  pub outcome: AllocationOutcome,
}

/// Combine existing dollar amounts with new allocations.
pub fn merge_allocations(
  holdings: &Holdings,
  allocation: &SymbolValues,
  policy: MergePolicy,
) -> SymbolValues {
  let mut merged = SymbolValues::from_pairs(holdings.iter());
  for (symbol, amount) in allocation.iter() {
    match policy {
      MergePolicy::Sum => merged.add(symbol, amount),
      MergePolicy::Overwrite => merged.set(symbol, amount),
    }
  }
  merged
}

/// Symbols of the holdings followed by candidates not already held.
pub fn union_symbols(holdings: &Holdings, candidates: &CandidateSet) -> Vec<String> {
  let mut symbols = holdings.symbols();
  for c in candidates.symbols() {
    if !symbols.contains(c) {
      symbols.push(c.clone());
    }
  }
  symbols
}

/// Single entry point for allocation runs against one [`PriceSource`].
pub struct AllocationEngine<S> {
  source: S,
  config: AllocatorConfig,
}

impl<S: PriceSource> AllocationEngine<S> {
  pub fn new(source: S, config: AllocatorConfig) -> Self {
    Self { source, config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &AllocatorConfig {
    &self.config
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Probe every holding; invalid symbols are dropped from the returned holdings.
  pub async fn validate_holdings(&self, holdings: &Holdings) -> Result<(Holdings, ValidationReport)> {
    let report = validate_symbols(
      &self.source,
      &holdings.symbols(),
      self.config.probe_concurrency,
    )
    .await;

    if !report.invalid.is_empty() {
      warn!(invalid = ?report.invalid, "dropping tickers that failed validation");
    }
    if report.valid.is_empty() {
      return Err(AllocError::validation("no valid tickers to process"));
    }

    Ok((holdings.retain_symbols(&report.valid), report))
  }

  /// Fetch and align prices over the configured window.
  pub async fn fetch_prices(&self, symbols: &[String]) -> Result<PriceTable> {
    let table = fetch_price_table(
      &self.source,
      symbols,
      self.config.history_start,
      self.config.history_end,
    )
    .await?;

    debug!(
      rows = table.n_dates(),
      first = ?table.dates().first(),
      last = ?table.dates().last(),
      "aligned price table"
    );
    Ok(table)
  }

  /// Fetch prices for holdings and candidates, then [`Self::allocate`].
  pub async fn optimize(
    &self,
    holdings: &Holdings,
    candidates: &CandidateSet,
    additional_investment: f64,
  ) -> Result<AllocationOutcome> {
    check_request(candidates, additional_investment)?;

    let symbols = union_symbols(holdings, candidates);
    info!(
      symbols = symbols.len(),
      candidates = candidates.len(),
      invested = holdings.total(),
      start = %self.config.history_start,
      end = %self.config.history_end,
      "fetching price history"
    );
    let prices = self.fetch_prices(&symbols).await?;

    self.allocate(&prices, holdings, candidates, additional_investment)
  }

  /// Validate holdings, drop the invalid ones, then [`Self::optimize`].
  pub async fn run(&self, request: &AllocationRequest) -> Result<RunOutcome> {
    check_request(&request.candidates, request.additional_investment)?;
    if request.holdings.is_empty() {
      return Err(AllocError::validation("enter at least one ticker"));
    }

    let (holdings, validation) = self.validate_holdings(&request.holdings).await?;
    let outcome = self
      .optimize(&holdings, &request.candidates, request.additional_investment)
      .await?;

    Ok(RunOutcome {
      validation,
      outcome,
    })
  }

  /// Deterministic allocation on already fetched prices.
  pub fn allocate(
    &self,
    prices: &PriceTable,
    holdings: &Holdings,
    candidates: &CandidateSet,
    additional_investment: f64,
  ) -> Result<AllocationOutcome> {
    check_request(candidates, additional_investment)?;
    let cfg = &self.config;

    let stats = AssetStatistics::from_prices(prices, cfg.returns_method, cfg.periods_per_year)?;
    let alt = stats.subset(candidates.symbols())?;

    let raw = max_sharpe(alt.mu(), alt.cov(), cfg.risk_free, cfg.max_iters)?;
    let weights = clean_weights(&raw, cfg.clean_cutoff);
    let candidate_performance = portfolio_performance(&weights, alt.mu(), alt.cov(), cfg.risk_free);

    let candidate_weights = SymbolValues::from_pairs(
      alt
        .symbols()
        .iter()
        .cloned()
        .zip(weights.iter().copied()),
    );
    let allocation = candidate_weights.scaled(additional_investment);
    info!(allocation = %allocation, "alternative allocation");

    let merged = merge_allocations(holdings, &allocation, cfg.merge_policy);
    let total = merged.total();
    if total <= 0.0 {
      return Err(AllocError::validation(
        "combined portfolio has no value; enter holdings or an investment amount",
      ));
    }
    for symbol in merged.symbols() {
      if stats.index_of(symbol).is_none() {
        return Err(AllocError::unavailable(symbol, "missing from price statistics"));
      }
    }

    let blended = DVector::from_fn(stats.len(), |i, _| {
      merged.get(&stats.symbols()[i]).unwrap_or(0.0) / total
    });
    let performance = portfolio_performance(&blended, stats.mu(), stats.cov(), cfg.risk_free);
    info!(
      expected_return = performance.expected_return,
      volatility = performance.volatility,
      sharpe = performance.sharpe,
      "blended portfolio"
    );

    let blended_weights = SymbolValues::from_pairs(
      stats
        .symbols()
        .iter()
        .cloned()
        .zip(blended.iter().copied()),
    );

    Ok(AllocationOutcome {
      candidate_weights,
      allocation,
      merged,
      blended_weights,
      candidate_performance,
      performance,
    })
  }
}

fn check_request(candidates: &CandidateSet, additional_investment: f64) -> Result<()> {
  if candidates.is_empty() {
    return Err(AllocError::validation("select at least one alternative asset"));
  }
  if !additional_investment.is_finite() || additional_investment < 0.0 {
    return Err(AllocError::validation(format!(
      "investment amount must be non-negative, got {additional_investment}"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;
  use crate::input::CandidateSelection;
  use crate::market::StaticSource;

  fn engine(symbols: &[&str]) -> AllocationEngine<StaticSource> {
    let cfg = AllocatorConfig::default();
    let source = StaticSource::synthetic(symbols.iter().copied(), cfg.history_start, cfg.history_end);
    AllocationEngine::new(source, cfg)
  }

  fn subset(symbols: &[&str]) -> CandidateSet {
    CandidateSet::resolve(&CandidateSelection::Subset(
      symbols.iter().map(|s| s.to_string()).collect(),
    ))
    .unwrap()
  }

  #[test]
  fn merge_sums_or_overwrites_shared_symbols() {
    let holdings = Holdings::new([("GLD", 500.0), ("AAPL", 100.0)]).unwrap();
    let allocation = SymbolValues::from_pairs([("GLD", 200.0), ("BND", 300.0)]);

    let summed = merge_allocations(&holdings, &allocation, MergePolicy::Sum);
    assert_eq!(summed.get("GLD"), Some(700.0));
    assert_eq!(summed.get("BND"), Some(300.0));
    assert_eq!(summed.total(), 1100.0);

    let replaced = merge_allocations(&holdings, &allocation, MergePolicy::Overwrite);
    assert_eq!(replaced.get("GLD"), Some(200.0));
  }

  #[test]
  fn union_keeps_holdings_first_without_duplicates() {
    let holdings = Holdings::new([("AAPL", 1.0), ("GLD", 1.0)]).unwrap();
    let symbols = union_symbols(&holdings, &subset(&["GLD", "BND"]));

    assert_eq!(symbols, vec!["AAPL", "GLD", "BND"]);
  }

  #[test]
  fn allocation_sums_to_investment() {
    let engine = engine(&["AAPL", "MSFT", "GLD", "BND", "VNQ"]);
    let holdings = Holdings::new([("AAPL", 1000.0), ("MSFT", 2000.0)]).unwrap();
    let candidates = subset(&["GLD", "BND", "VNQ"]);

    let out = tokio_test::block_on(engine.optimize(&holdings, &candidates, 2000.0)).unwrap();

    assert_relative_eq!(out.allocation.total(), 2000.0, epsilon = 1e-6);
    assert_relative_eq!(out.candidate_weights.total(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(out.blended_weights.total(), 1.0, epsilon = 1e-6);
    assert!(out.candidate_weights.iter().all(|(_, w)| w >= 0.0));
    assert_relative_eq!(out.merged.total(), 5000.0, epsilon = 1e-6);
  }

  #[test]
  fn zero_investment_keeps_holdings_weights() {
    let engine = engine(&["AAPL", "MSFT", "GLD", "BND"]);
    let holdings = Holdings::new([("AAPL", 1000.0), ("MSFT", 3000.0)]).unwrap();

    let out =
      tokio_test::block_on(engine.optimize(&holdings, &subset(&["GLD", "BND"]), 0.0)).unwrap();

    assert_relative_eq!(out.blended_weights.get("AAPL").unwrap(), 0.25, epsilon = 1e-12);
    assert_relative_eq!(out.blended_weights.get("GLD").unwrap(), 0.0, epsilon = 1e-12);
  }

  #[test]
  fn empty_portfolio_value_is_rejected() {
    let engine = engine(&["AAPL", "GLD", "BND"]);
    let holdings = Holdings::new([("AAPL", 0.0)]).unwrap();

    let err =
      tokio_test::block_on(engine.optimize(&holdings, &subset(&["GLD", "BND"]), 0.0)).unwrap_err();
    assert!(matches!(err, AllocError::Validation(_)));
  }

  #[test]
  fn negative_investment_is_rejected_before_fetching() {
    let engine = engine(&["AAPL", "GLD"]);
    let holdings = Holdings::new([("AAPL", 10.0)]).unwrap();

    let err =
      tokio_test::block_on(engine.optimize(&holdings, &subset(&["GLD"]), -1.0)).unwrap_err();
    assert!(matches!(err, AllocError::Validation(_)));
    assert_eq!(engine.source().calls(), 0);
  }

  #[test]
  fn missing_history_is_data_unavailable() {
    let engine = engine(&["AAPL", "GLD"]);
    let holdings = Holdings::new([("AAPL", 10.0)]).unwrap();

    let err =
      tokio_test::block_on(engine.optimize(&holdings, &subset(&["GLD", "TLT"]), 100.0))
        .unwrap_err();
    assert!(matches!(err, AllocError::DataUnavailable { ref symbol, .. } if symbol == "TLT"));
  }

  #[test]
  fn run_drops_invalid_tickers() {
    let engine = engine(&["AAPL", "GLD", "BND"]);
    let request = AllocationRequest {
      holdings: Holdings::new([("AAPL", 1000.0), ("ZZZZINVALID", 500.0)]).unwrap(),
      candidates: subset(&["GLD", "BND"]),
      additional_investment: 1000.0,
    };

    let run = tokio_test::block_on(engine.run(&request)).unwrap();

    assert_eq!(run.validation.invalid, vec!["ZZZZINVALID".to_string()]);
    assert!(run.outcome.blended_weights.get("ZZZZINVALID").is_none());
    assert_relative_eq!(run.outcome.merged.total(), 2000.0, epsilon = 1e-6);
  }

  #[test]
  fn run_fails_when_every_ticker_is_invalid() {
    let engine = engine(&["GLD"]);
    let request = AllocationRequest {
      holdings: Holdings::new([("NOPE", 1.0)]).unwrap(),
      candidates: subset(&["GLD"]),
      additional_investment: 1.0,
    };

    let err = tokio_test::block_on(engine.run(&request)).unwrap_err();
    assert_eq!(err, AllocError::Validation("no valid tickers to process".into()));
  }

  #[test]
  fn shared_symbol_sums_under_default_policy() {
    let engine = engine(&["GLD", "BND"]);
    let holdings = Holdings::new([("GLD", 1000.0)]).unwrap();

    let out =
      tokio_test::block_on(engine.optimize(&holdings, &subset(&["GLD", "BND"]), 500.0)).unwrap();

    let new_gld = out.allocation.get("GLD").unwrap();
    assert_relative_eq!(out.merged.get("GLD").unwrap(), 1000.0 + new_gld, epsilon = 1e-9);
    assert_relative_eq!(out.merged.total(), 1500.0, epsilon = 1e-9);
  }
}
