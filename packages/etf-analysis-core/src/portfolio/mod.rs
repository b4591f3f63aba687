//! Portfolio construction and ETF comparison.
//!
//! Provides the ESG-aware weighting of an ETF's holdings and rankings of ETFs
//! by cumulative return or mean ESG score.

mod optimizer;
mod ranking;

pub use optimizer::{optimize, OptimizerSettings, WEIGHT_SUM_TOLERANCE};
pub use ranking::{cumulative_return, rank_by_cumulative_return, rank_by_mean_esg};
