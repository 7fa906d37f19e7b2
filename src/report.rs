//! # Report
//!
//! Console tables and the blended-allocation pie chart.

use std::fs;
use std::path::Path;

use plotly::Layout;
use plotly::Pie;
use plotly::Plot;
use plotly::common::Title;
use prettytable::Table;
use prettytable::format::consts::FORMAT_BOX_CHARS;
use prettytable::row;

use crate::error::AllocError;
use crate::error::Result;
use crate::market::ValidationReport;
use crate::portfolio::AllocationOutcome;
use crate::portfolio::PerformanceSummary;
use crate::portfolio::SymbolValues;

pub const PIE_TITLE: &str = "Portfolio Allocation After Adding Alternatives";

/// Two-column `Asset | Amount ($)` table.
pub fn allocation_table(allocation: &SymbolValues) -> Table {
  let mut table = Table::new();
  table.set_format(*FORMAT_BOX_CHARS);
  table.set_titles(row!["Asset", "Amount ($)"]);
  for (symbol, amount) in allocation.iter() {
    table.add_row(row![symbol, r->format!("{amount:.2}")]);
  }
  table
}

/// Two-column `Asset | Weight` table with percentages.
pub fn weights_table(weights: &SymbolValues) -> Table {
  let mut table = Table::new();
  table.set_format(*FORMAT_BOX_CHARS);
  table.set_titles(row!["Asset", "Weight"]);
  for (symbol, weight) in weights.iter() {
    table.add_row(row![symbol, r->format!("{:.2}%", weight * 100.0)]);
  }
  table
}

/// `Expected Return`, `Expected Volatility` and `Sharpe Ratio` lines.
pub fn summary_lines(perf: &PerformanceSummary) -> Vec<String> {
  vec![
    format!("Expected Return: {:.2}%", perf.expected_return * 100.0),
    format!("Expected Volatility: {:.2}%", perf.volatility * 100.0),
    format!("Sharpe Ratio: {:.2}", perf.sharpe),
  ]
}

/// Warning line for tickers dropped by validation, if any.
pub fn invalid_ticker_notice(report: &ValidationReport) -> Option<String> {
  if report.invalid.is_empty() {
    None
  } else {
    Some(format!(
      "The following tickers are invalid or not found: {}",
      report.invalid.join(", ")
    ))
  }
}

/// Full text report.
pub fn render(outcome: &AllocationOutcome, validation: Option<&ValidationReport>) -> String {
  let mut out = String::new();

  if let Some(line) = validation.and_then(invalid_ticker_notice) {
    out.push_str(&line);
    out.push_str("\n\n");
  }

  out.push_str("Recommended Alternative Assets Allocation\n");
  out.push_str(&allocation_table(&outcome.allocation).to_string());
  out.push('\n');

  out.push_str("Portfolio Weights After Addition\n");
  let held: SymbolValues =
    SymbolValues::from_pairs(outcome.blended_weights.iter().filter(|(_, w)| *w > 0.0));
  out.push_str(&weights_table(&held).to_string());
  out.push('\n');

  out.push_str("Expected Portfolio Performance After Addition\n");
  for line in summary_lines(&outcome.performance) {
    out.push_str(&line);
    out.push('\n');
  }
  out
}

/// Pie chart of non-zero weights.
pub fn allocation_pie(weights: &SymbolValues) -> Plot {
  let (labels, values): (Vec<&str>, Vec<f64>) =
    weights.iter().filter(|(_, w)| *w > 0.0).unzip();

  let mut plot = Plot::new();
  plot.add_trace(Pie::new(values).labels(labels));
  plot.set_layout(Layout::new().title(Title::from(PIE_TITLE)));
  plot
}

/// Write the pie chart as a standalone HTML page.
pub fn write_pie_html(weights: &SymbolValues, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  fs::write(path, allocation_pie(weights).to_html()).map_err(|e| {
    AllocError::Output(format!("cannot write chart to {}: {e}", path.display()))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn outcome() -> AllocationOutcome {
    AllocationOutcome {
      allocation: SymbolValues::from_pairs([("GLD", 1234.5), ("BND", 765.5)]),
      blended_weights: SymbolValues::from_pairs([("AAPL", 0.5), ("GLD", 0.3), ("BND", 0.2), ("VNQ", 0.0)]),
      performance: PerformanceSummary {
        expected_return: 0.1234,
        volatility: 0.2,
        sharpe: 0.5170,
      },
      ..Default::default()
    }
  }

  #[test]
  fn summary_uses_two_decimals() {
    let lines = summary_lines(&outcome().performance);
    assert_eq!(
      lines,
      vec![
        "Expected Return: 12.34%",
        "Expected Volatility: 20.00%",
        "Sharpe Ratio: 0.52"
      ]
    );
  }

  #[test]
  fn render_lists_allocations_and_invalid_tickers() {
    let validation = ValidationReport {
      valid: vec!["AAPL".into()],
      invalid: vec!["ZZZZINVALID".into()],
    };
    let text = render(&outcome(), Some(&validation));

    assert!(text.starts_with("The following tickers are invalid or not found: ZZZZINVALID"));
    assert!(text.contains("1234.50"));
    assert!(text.contains("765.50"));
    assert!(text.contains("50.00%"));
    assert!(!text.contains("VNQ"));
  }

  #[test]
  fn pie_skips_zero_weights() {
    let html = allocation_pie(&outcome().blended_weights).to_html();

    assert!(html.contains("AAPL"));
    assert!(!html.contains("VNQ"));
  }

  #[test]
  fn pie_page_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allocation.html");

    write_pie_html(&outcome().blended_weights, &path).unwrap();

    let html = fs::read_to_string(&path).unwrap();
    assert!(html.contains(PIE_TITLE));
  }

  #[test]
  fn unwritable_chart_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("allocation.html");

    let err = write_pie_html(&outcome().blended_weights, &path).unwrap_err();
    assert!(matches!(err, AllocError::Output(_)));
  }
}
