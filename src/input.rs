//! # Input Resolver
//!
//! Turns free-text form fields into [`Holdings`] and a [`CandidateSet`].
//! Pure parsing, no I/O.

use std::fmt;

use crate::error::AllocError;
use crate::error::Result;

/// Fixed pool of alternative assets: commodities, bonds, a REIT and two cryptocurrencies.
pub const ALTERNATIVE_UNIVERSE: &[&str] = &[
  "GLD", "SLV", "VNQ", "BND", "AGG", "BTC-USD", "ETH-USD", "LQD", "TLT", "GSG", "DBC",
];

/// Subset preselected when the full universe is not requested.
pub const DEFAULT_CANDIDATES: &[&str] = &["GLD", "VNQ", "BND", "BTC-USD"];

/// Existing positions: unique upper-case symbols with non-negative dollar amounts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Holdings {
  entries: Vec<(String, f64)>,
}

impl Holdings {
  /// Build from pairs, rejecting duplicates, blank symbols and negative or non-finite amounts.
  pub fn new<I, S>(pairs: I) -> Result<Self>
  where
    I: IntoIterator<Item = (S, f64)>,
    S: AsRef<str>,
  {
    let mut entries: Vec<(String, f64)> = Vec::new();
    for (symbol, amount) in pairs {
      let symbol = symbol.as_ref().trim().to_uppercase();
      if symbol.is_empty() {
        return Err(AllocError::validation("empty ticker symbol"));
      }
      if !amount.is_finite() || amount < 0.0 {
        return Err(AllocError::validation(format!(
          "amount for {symbol} must be a non-negative number, got {amount}"
        )));
      }
      if entries.iter().any(|(s, _)| *s == symbol) {
        return Err(AllocError::validation(format!("ticker {symbol} is listed twice")));
      }
      entries.push((symbol, amount));
    }
    Ok(Self { entries })
  }

  pub fn symbols(&self) -> Vec<String> {
    self.entries.iter().map(|(s, _)| s.clone()).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.entries.iter().map(|(s, a)| (s.as_str(), *a))
  }

  pub fn total(&self) -> f64 {
    self.entries.iter().map(|(_, a)| a).sum()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Keep only the holdings whose symbol is in `symbols`.
  pub fn retain_symbols(&self, symbols: &[String]) -> Self {
    Self {
      entries: self
        .entries
        .iter()
        .filter(|(s, _)| symbols.contains(s))
        .cloned()
        .collect(),
    }
  }
}

/// Which alternatives to consider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CandidateSelection {
  /// The whole [`ALTERNATIVE_UNIVERSE`].
  #[default]
  All,
  /// A user-chosen subset of the universe.
  Subset(Vec<String>),
}

/// Non-empty, de-duplicated list of candidate alternatives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateSet {
  symbols: Vec<String>,
}

impl CandidateSet {
  pub fn resolve(selection: &CandidateSelection) -> Result<Self> {
    let raw: Vec<String> = match selection {
      CandidateSelection::All => ALTERNATIVE_UNIVERSE.iter().map(|s| s.to_string()).collect(),
      CandidateSelection::Subset(list) => list
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect(),
    };

    let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
    for symbol in raw {
      if !ALTERNATIVE_UNIVERSE.contains(&symbol.as_str()) {
        return Err(AllocError::validation(format!(
          "{symbol} is not an alternative asset (choose from {})",
          ALTERNATIVE_UNIVERSE.join(", ")
        )));
      }
      if !symbols.contains(&symbol) {
        symbols.push(symbol);
      }
    }

    if symbols.is_empty() {
      return Err(AllocError::validation("select at least one alternative asset"));
    }
    Ok(Self { symbols })
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}

impl fmt::Display for CandidateSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.symbols.join(", "))
  }
}

/// Split comma-separated tickers, trim, upper-case, drop empty tokens.
pub fn parse_tickers(text: &str) -> Vec<String> {
  text
    .split(',')
    .map(|t| t.trim().to_uppercase())
    .filter(|t| !t.is_empty())
    .collect()
}

/// Split comma-separated amounts and parse each one. Empty tokens are skipped.
pub fn parse_amounts(text: &str) -> Result<Vec<f64>> {
  text
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .enumerate()
    .map(|(position, token)| parse_number("amount", token, position + 1))
    .collect()
}

/// Parse the additional-investment scalar. Must be a non-negative number.
pub fn parse_amount(text: &str) -> Result<f64> {
  let value = parse_number("investment amount", text.trim(), 1)?;
  if value < 0.0 {
    return Err(AllocError::validation(format!(
      "investment amount must be non-negative, got {value}"
    )));
  }
  Ok(value)
}

fn parse_number(what: &'static str, token: &str, position: usize) -> Result<f64> {
  match token.parse::<f64>() {
    Ok(v) if v.is_finite() => Ok(v),
    _ => Err(AllocError::Parse {
      what,
      token: token.to_string(),
      position,
    }),
  }
}

/// Resolve the three form fields into holdings and candidates.
pub fn resolve(
  tickers_text: &str,
  amounts_text: &str,
  selection: &CandidateSelection,
) -> Result<(Holdings, CandidateSet)> {
  let tickers = parse_tickers(tickers_text);
  let amounts = parse_amounts(amounts_text)?;

  if tickers.is_empty() {
    return Err(AllocError::validation("enter at least one ticker"));
  }
  if tickers.len() != amounts.len() {
    return Err(AllocError::validation(format!(
      "{} tickers but {} amounts",
      tickers.len(),
      amounts.len()
    )));
  }

  let holdings = Holdings::new(tickers.into_iter().zip(amounts))?;
  let candidates = CandidateSet::resolve(selection)?;
  Ok((holdings, candidates))
}
