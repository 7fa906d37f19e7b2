//! # alt-allocator
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\ge 0} \frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Sizes a new investment across a fixed pool of alternative assets
//! (commodities, bonds, a REIT, cryptocurrencies) with a maximum-Sharpe
//! criterion, merges it with an existing stock portfolio and reports the
//! blended expected return, volatility and Sharpe ratio.
//!
//! ```text
//! input::resolve -> market::validate_symbols -> market::fetch_price_table
//!   -> portfolio::AllocationEngine::allocate -> report
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod market;
pub mod portfolio;
pub mod report;

pub use config::AllocatorConfig;
pub use error::AllocError;
pub use error::Result;
pub use input::ALTERNATIVE_UNIVERSE;
pub use input::CandidateSelection;
pub use input::CandidateSet;
pub use input::Holdings;
pub use market::PricePoint;
pub use market::PriceSource;
pub use market::PriceTable;
pub use market::StaticSource;
pub use market::SyntheticSource;
pub use portfolio::AllocationEngine;
pub use portfolio::AllocationOutcome;
pub use portfolio::AllocationRequest;
pub use portfolio::MergePolicy;
pub use portfolio::PerformanceSummary;
pub use portfolio::ReturnsMethod;
