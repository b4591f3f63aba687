//! ETF Analysis Core - risk and sustainability analytics for exchange-traded funds.
//!
//! This crate provides the numeric core of the ETF analysis toolkit:
//!
//! - **Returns engine**: Price series to fractional return series
//! - **Risk metrics**: Beta, Sharpe ratio, max drawdown, VaR, CVaR, alpha
//! - **Sustainable portfolio**: ESG-aware weighting of an ETF's holdings
//! - **Ranking**: ETFs ordered by cumulative return or mean ESG score
//!
//! Market data and ESG scores are injected through the [`MarketDataProvider`]
//! and [`SustainabilityProvider`] traits; nothing here touches the network.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use etf_analysis_core::{analytics, EsgScores, PriceSeries};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
//! let prices = PriceSeries::from_daily_closes(start, &[100.0, 102.0, 99.0, 104.0]).unwrap();
//!
//! let returns = analytics::compute_returns(&prices);
//! assert_eq!(returns.len(), 3);
//!
//! let drawdown = analytics::max_drawdown(&prices.closes());
//! assert!(drawdown < 0.0);
//!
//! let esg = EsgScores::new(50.0).unwrap();
//! let result = etf_analysis_core::optimize(&[("AAA".to_string(), prices)], &esg, 0.5, 0.5).unwrap();
//! assert_eq!(result.holdings.len(), 1);
//! ```

pub mod analytics;
pub mod analyzer;
pub mod config;
pub mod esg;
pub mod market;
pub mod portfolio;
pub mod types;

// Re-export commonly used types
pub use types::{
    AlphaBeta, ApiResponse, EsgSummary, Holding, Period, PortfolioResult, PricePoint,
    PriceSeries, RankedEntry, Ranking, RankingMetric, ReturnSeries, RiskMetrics, SymbolFailure,
};

// Re-export main functionality
pub use analytics::{
    align_returns, alpha_beta, beta, calculate_full_risk_metrics, calculate_risk_metrics,
    calculate_risk_metrics_batch, compute_returns, conditional_value_at_risk, max_drawdown,
    sharpe_ratio, value_at_risk, RiskSettings,
};
pub use analyzer::EtfAnalyzer;
pub use config::AnalysisConfig;
pub use esg::{score_holdings, EsgScores, SustainabilityProvider, DEFAULT_ESG_SCORE};
pub use market::{list_available_tickers, Dataset, MarketDataProvider, AVAILABLE_ETF_TICKERS};
pub use portfolio::{
    cumulative_return, optimize, rank_by_cumulative_return, rank_by_mean_esg, OptimizerSettings,
};

/// Error types for etf-analysis-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Misaligned series: {left} vs {right} observations")]
    MisalignedSeries { left: usize, right: usize },

    #[error("Invalid weights: sustainability {sustainability} + returns {returns} must sum to 1.0")]
    InvalidWeights { sustainability: f64, returns: f64 },

    #[error("Degenerate optimization: combined scores sum to zero")]
    DegenerateOptimization,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for etf-analysis-core operations.
pub type Result<T> = std::result::Result<T, Error>;
