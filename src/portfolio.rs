//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Statistics, max-Sharpe optimization and allocation of new money across
//! alternative assets.

pub mod data;
pub mod engine;
pub mod optimizers;
pub mod types;

pub use data::AssetStatistics;
pub use data::expected_returns;
pub use data::sample_covariance;
pub use data::simple_returns;
pub use engine::AllocationEngine;
pub use engine::AllocationRequest;
pub use engine::RunOutcome;
pub use engine::merge_allocations;
pub use engine::union_symbols;
pub use optimizers::clean_weights;
pub use optimizers::max_sharpe;
pub use optimizers::portfolio_performance;
pub use types::AllocationOutcome;
pub use types::MergePolicy;
pub use types::PerformanceSummary;
pub use types::ReturnsMethod;
pub use types::SymbolValues;
