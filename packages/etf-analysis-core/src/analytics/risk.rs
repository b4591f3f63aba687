//! ETF risk metrics calculation.
//!
//! Provides beta, Sharpe ratio, max drawdown, historical VaR/CVaR and alpha.
//! Every operation is pure; undefined results (zero variance, too few
//! observations) are reported as errors, never as a silent zero.

use super::returns::{align_returns, compute_returns};
use super::stats::{mean, percentile, sample_covariance, sample_std, sample_variance};
use crate::types::{AlphaBeta, PriceSeries, RiskMetrics};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Trading periods per year used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Default confidence level for VaR and CVaR.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Standard deviations below this are treated as zero.
const ZERO_STD_TOLERANCE: f64 = 1e-12;

/// Parameters for the full risk report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskSettings {
    /// Periods per year for annualization (252 for daily data)
    pub periods_per_year: u32,
    /// Confidence level for VaR and CVaR, in (0, 1)
    pub confidence_level: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "confidence level must be in (0, 1), got {}",
            confidence
        )))
    }
}

fn insufficient(what: &str, needed: usize, got: usize) -> Error {
    Error::InsufficientData(format!(
        "{} needs at least {} observations, got {}",
        what, needed, got
    ))
}

/// Market beta: `cov(returns, market) / var(market)`.
///
/// Both slices must already be aligned by date.
pub fn beta(returns: &[f64], market_returns: &[f64]) -> Result<f64> {
    if returns.len() != market_returns.len() {
        return Err(Error::MisalignedSeries {
            left: returns.len(),
            right: market_returns.len(),
        });
    }

    let market_variance =
        sample_variance(market_returns).ok_or_else(|| insufficient("beta", 2, returns.len()))?;
    if market_variance.sqrt() < ZERO_STD_TOLERANCE {
        return Err(Error::DivisionByZero(
            "market returns have zero variance".to_string(),
        ));
    }

    let covariance = sample_covariance(returns, market_returns)
        .ok_or_else(|| insufficient("beta", 2, returns.len()))?;

    Ok(covariance / market_variance)
}

/// Annualized Sharpe ratio: `mean / std * sqrt(periods_per_year)`.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: u32) -> Result<f64> {
    let std = sample_std(returns).ok_or_else(|| insufficient("Sharpe ratio", 2, returns.len()))?;
    if std < ZERO_STD_TOLERANCE {
        return Err(Error::DivisionByZero(
            "returns have zero standard deviation".to_string(),
        ));
    }

    let mean = mean(returns).ok_or_else(|| insufficient("Sharpe ratio", 2, returns.len()))?;
    Ok(mean / std * f64::from(periods_per_year).sqrt())
}

/// Maximum drawdown of a price path.
///
/// Returns the worst `price / running_max - 1`, a fraction <= 0
/// (e.g. -0.15 for a 15% decline). Non-decreasing or empty paths give 0.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let Some(&first) = prices.first() else {
        return 0.0;
    };

    let mut running_max = first;
    let mut max_drawdown = 0.0;

    for &price in prices {
        if price > running_max {
            running_max = price;
        }
        let drawdown = price / running_max - 1.0;
        if drawdown < max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}

/// Historical Value at Risk.
///
/// The `(1 - confidence) * 100` percentile of the returns, interpolated
/// linearly between order statistics. Expressed as a return fraction, so a
/// loss threshold is negative.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    check_confidence(confidence)?;
    percentile(returns, (1.0 - confidence) * 100.0)
        .ok_or_else(|| insufficient("VaR", 1, returns.len()))
}

/// Conditional Value at Risk (expected shortfall).
///
/// Mean of the returns at or below the VaR threshold. An empty tail (only
/// possible with non-finite input) is reported as `InsufficientData`.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    let var = value_at_risk(returns, confidence)?;

    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
    mean(&tail).ok_or_else(|| {
        tracing::warn!(var, confidence, "no returns at or below VaR");
        Error::InsufficientData(format!("no returns at or below VaR {}", var))
    })
}

/// Alpha and beta against a benchmark.
///
/// `alpha = mean(returns) - beta * mean(benchmark)`, per period.
pub fn alpha_beta(returns: &[f64], benchmark_returns: &[f64]) -> Result<AlphaBeta> {
    let beta = beta(returns, benchmark_returns)?;
    let mean_returns = mean(returns).ok_or_else(|| insufficient("alpha", 2, returns.len()))?;
    let mean_benchmark = mean(benchmark_returns)
        .ok_or_else(|| insufficient("alpha", 2, benchmark_returns.len()))?;

    Ok(AlphaBeta {
        alpha: mean_returns - beta * mean_benchmark,
        beta,
    })
}

/// Beta, Sharpe ratio and max drawdown of an ETF against a benchmark.
///
/// Beta uses returns aligned by date; the Sharpe ratio uses the ETF's own
/// return history; the drawdown uses its prices.
pub fn calculate_risk_metrics(
    prices: &PriceSeries,
    benchmark_prices: &PriceSeries,
    periods_per_year: u32,
) -> Result<RiskMetrics> {
    let returns = compute_returns(prices);
    let benchmark_returns = compute_returns(benchmark_prices);
    let (aligned, aligned_benchmark) = align_returns(&returns, &benchmark_returns);

    let metrics = RiskMetrics {
        beta: beta(&aligned, &aligned_benchmark)?,
        sharpe_ratio: sharpe_ratio(returns.values(), periods_per_year)?,
        max_drawdown: max_drawdown(&prices.closes()),
        value_at_risk: None,
        conditional_value_at_risk: None,
        alpha: None,
        confidence_level: None,
    };

    tracing::debug!(
        observations = returns.len(),
        aligned = aligned.len(),
        beta = metrics.beta,
        sharpe = metrics.sharpe_ratio,
        "calculated risk metrics"
    );

    Ok(metrics)
}

/// Full risk report: beta, Sharpe, drawdown, VaR, CVaR and alpha.
pub fn calculate_full_risk_metrics(
    prices: &PriceSeries,
    benchmark_prices: &PriceSeries,
    settings: &RiskSettings,
) -> Result<RiskMetrics> {
    let returns = compute_returns(prices);
    let benchmark_returns = compute_returns(benchmark_prices);
    let (aligned, aligned_benchmark) = align_returns(&returns, &benchmark_returns);

    let AlphaBeta { alpha, beta } = alpha_beta(&aligned, &aligned_benchmark)?;
    let sharpe = sharpe_ratio(returns.values(), settings.periods_per_year)?;
    let var = value_at_risk(returns.values(), settings.confidence_level)?;
    let cvar = conditional_value_at_risk(returns.values(), settings.confidence_level)?;

    Ok(RiskMetrics {
        beta,
        sharpe_ratio: sharpe,
        max_drawdown: max_drawdown(&prices.closes()),
        value_at_risk: Some(var),
        conditional_value_at_risk: Some(cvar),
        alpha: Some(alpha),
        confidence_level: Some(settings.confidence_level),
    })
}

/// Full risk reports for many symbols against one benchmark.
///
/// Symbols are processed in parallel; each gets its own result, in input
/// order, so one failing series does not affect the others.
pub fn calculate_risk_metrics_batch(
    series: &[(String, PriceSeries)],
    benchmark_prices: &PriceSeries,
    settings: &RiskSettings,
) -> Vec<(String, Result<RiskMetrics>)> {
    series
        .par_iter()
        .map(|(symbol, prices)| {
            let result = calculate_full_risk_metrics(prices, benchmark_prices, settings);
            if let Err(e) = &result {
                tracing::warn!(symbol = %symbol, error = %e, "risk metrics unavailable");
            }
            (symbol.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        PriceSeries::from_daily_closes(start, closes).unwrap()
    }

    #[test]
    fn test_beta_of_scaled_market() {
        let market = vec![0.01, -0.02, 0.015, 0.005, -0.01];
        let returns: Vec<f64> = market.iter().map(|m| 2.0 * m).collect();

        assert_relative_eq!(beta(&returns, &market).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_zero_variance_market() {
        let market = vec![0.0; 10];
        let returns = vec![0.01, -0.01, 0.02, 0.0, 0.01, -0.02, 0.0, 0.01, 0.0, 0.01];

        let result = beta(&returns, &market);
        assert!(matches!(result, Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn test_beta_misaligned() {
        let result = beta(&[0.01, 0.02, 0.03], &[0.01, 0.02]);
        assert!(matches!(
            result,
            Err(Error::MisalignedSeries { left: 3, right: 2 })
        ));
    }

    #[test]
    fn test_beta_insufficient_data() {
        let result = beta(&[0.01], &[0.02]);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_sharpe_ratio() {
        let returns = vec![0.01, -0.01, 0.02, 0.0];
        let sharpe = sharpe_ratio(&returns, TRADING_DAYS_PER_YEAR).unwrap();
        assert_relative_eq!(sharpe, 6.148170459575759, epsilon = 1e-9);

        let negative: Vec<f64> = returns.iter().map(|r| r - 0.02).collect();
        assert!(sharpe_ratio(&negative, TRADING_DAYS_PER_YEAR).unwrap() < 0.0);
    }

    #[test]
    fn test_sharpe_ratio_constant_prices() {
        let prices = series(&[100.0; 30]);
        let returns = compute_returns(&prices);

        let result = sharpe_ratio(returns.values(), TRADING_DAYS_PER_YEAR);
        assert!(matches!(result, Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn test_max_drawdown() {
        assert_relative_eq!(max_drawdown(&[100.0, 50.0]), -0.5);

        // Peak 105, trough 103 afterwards
        let mdd = max_drawdown(&[100.0, 102.0, 101.0, 105.0, 103.0]);
        assert_relative_eq!(mdd, 103.0 / 105.0 - 1.0);
    }

    #[test]
    fn test_max_drawdown_no_loss() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 101.0, 103.0, 110.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_value_at_risk_interpolates() {
        let returns = vec![-0.05, -0.02, 0.00, 0.01, 0.03];

        // rank = 0.05 * 4 = 0.2 -> -0.05 + 0.2 * (-0.02 - -0.05)
        let var = value_at_risk(&returns, 0.95).unwrap();
        assert_relative_eq!(var, -0.044, epsilon = 1e-12);
    }

    #[test]
    fn test_value_at_risk_errors() {
        assert!(matches!(
            value_at_risk(&[], 0.95),
            Err(Error::InsufficientData(_))
        ));
        assert!(matches!(
            value_at_risk(&[0.01], 1.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            value_at_risk(&[0.01], 0.0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_conditional_value_at_risk() {
        let returns = vec![-0.05, -0.02, 0.00, 0.01, 0.03];
        let cvar = conditional_value_at_risk(&returns, 0.95).unwrap();
        assert_relative_eq!(cvar, -0.05);

        // Wider tail: 50th percentile is 0.0 -> mean of [-0.05, -0.02, 0.0]
        let cvar = conditional_value_at_risk(&returns, 0.5).unwrap();
        assert_relative_eq!(cvar, -0.07 / 3.0, epsilon = 1e-12);
        assert!(cvar <= value_at_risk(&returns, 0.5).unwrap());
    }

    #[test]
    fn test_conditional_value_at_risk_single_observation() {
        let cvar = conditional_value_at_risk(&[0.02], 0.95).unwrap();
        assert_relative_eq!(cvar, 0.02);
        assert!(matches!(
            conditional_value_at_risk(&[], 0.95),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_conditional_value_at_risk_empty_tail() {
        let result = conditional_value_at_risk(&[f64::NAN], 0.95);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_alpha_beta() {
        let benchmark = vec![0.01, -0.02, 0.015, 0.005, -0.01];
        let returns: Vec<f64> = benchmark.iter().map(|b| 1.5 * b + 0.001).collect();

        let ab = alpha_beta(&returns, &benchmark).unwrap();
        assert_relative_eq!(ab.beta, 1.5, epsilon = 1e-12);
        assert_relative_eq!(ab.alpha, 0.001, epsilon = 1e-12);
    }

    #[test]
    fn test_calculate_risk_metrics() {
        let etf = series(&[100.0, 102.0, 101.0, 105.0, 103.0, 104.0]);
        let benchmark = series(&[50.0, 50.5, 50.2, 51.0, 50.8, 51.1]);

        let metrics = calculate_risk_metrics(&etf, &benchmark, TRADING_DAYS_PER_YEAR).unwrap();

        assert!(metrics.beta.is_finite());
        assert!(metrics.beta > 0.0);
        assert!(metrics.sharpe_ratio.is_finite());
        assert_relative_eq!(metrics.max_drawdown, 103.0 / 105.0 - 1.0);
        assert!(metrics.value_at_risk.is_none());
        assert!(metrics.alpha.is_none());
    }

    #[test]
    fn test_calculate_risk_metrics_constant_benchmark() {
        let etf = series(&[100.0, 102.0, 101.0, 105.0]);
        let benchmark = series(&[50.0, 50.0, 50.0, 50.0]);

        let result = calculate_risk_metrics(&etf, &benchmark, TRADING_DAYS_PER_YEAR);
        assert!(matches!(result, Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn test_calculate_full_risk_metrics() {
        let etf = series(&[100.0, 101.0, 99.0, 102.0, 98.0, 103.0, 104.0, 101.0]);
        let benchmark = series(&[200.0, 201.0, 199.5, 202.0, 199.0, 203.0, 203.5, 201.0]);
        let settings = RiskSettings::default();

        let metrics = calculate_full_risk_metrics(&etf, &benchmark, &settings).unwrap();

        let var = metrics.value_at_risk.unwrap();
        let cvar = metrics.conditional_value_at_risk.unwrap();
        assert!(var < 0.0);
        assert!(cvar <= var);
        assert!(metrics.alpha.is_some());
        assert_eq!(metrics.confidence_level, Some(0.95));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let benchmark = series(&[200.0, 201.0, 199.5, 202.0, 199.0]);
        let batch = vec![
            ("GOOD".to_string(), series(&[10.0, 10.2, 10.1, 10.4, 10.3])),
            ("FLAT".to_string(), series(&[10.0, 10.0, 10.0, 10.0, 10.0])),
            ("EMPTY".to_string(), PriceSeries::empty()),
        ];

        let results = calculate_risk_metrics_batch(&batch, &benchmark, &RiskSettings::default());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "GOOD");
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::DivisionByZero(_))));
        assert!(matches!(results[2].1, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_repeated_calls_identical() {
        let returns = vec![0.012, -0.004, 0.007, -0.011, 0.003, 0.009];
        assert_eq!(
            sharpe_ratio(&returns, TRADING_DAYS_PER_YEAR).unwrap(),
            sharpe_ratio(&returns, TRADING_DAYS_PER_YEAR).unwrap()
        );
        assert_eq!(
            value_at_risk(&returns, 0.9).unwrap(),
            value_at_risk(&returns, 0.9).unwrap()
        );
    }
}
