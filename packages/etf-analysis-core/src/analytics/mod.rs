//! Return and risk analytics.
//!
//! Converts price series into return series and derives the classical risk
//! metrics from them: beta, Sharpe ratio, maximum drawdown, VaR, CVaR and alpha.

mod returns;
mod risk;
pub mod stats;

pub use returns::{align_returns, compute_returns, pct_change};
pub use risk::{
    alpha_beta, beta, calculate_full_risk_metrics, calculate_risk_metrics,
    calculate_risk_metrics_batch, conditional_value_at_risk, max_drawdown, sharpe_ratio,
    value_at_risk, RiskSettings, DEFAULT_CONFIDENCE_LEVEL, TRADING_DAYS_PER_YEAR,
};
