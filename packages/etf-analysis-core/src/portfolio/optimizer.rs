//! ESG-aware portfolio weighting.
//!
//! Each holding gets a combined score blending its mean return with its ESG
//! score; weights are the combined scores normalized to sum to one.

use crate::analytics::{compute_returns, stats};
use crate::esg::SustainabilityProvider;
use crate::types::{normalize_symbol, Holding, PortfolioResult, PriceSeries};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Allowed deviation of `sustainability_weight + returns_weight` from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Blend factors for the combined score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSettings {
    /// Weight on the ESG score
    pub sustainability_weight: f64,
    /// Weight on the mean return
    pub returns_weight: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            sustainability_weight: 0.5,
            returns_weight: 0.5,
        }
    }
}

impl OptimizerSettings {
    /// Check that the two blend factors sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        let sum = self.sustainability_weight + self.returns_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidWeights {
                sustainability: self.sustainability_weight,
                returns: self.returns_weight,
            });
        }
        Ok(())
    }
}

/// Score one holding. The flag is false when the price history is unusable
/// and the holding was left at zero.
///
/// Unusable means fewer than two returns, so a holding with exactly two prices
/// lands here too. Pandas-style statistics would still score it: one return
/// gives a finite mean (only the std is NaN), so its combined score would be
/// ESG-driven instead of zero.
fn evaluate_holding(
    symbol: &str,
    prices: &PriceSeries,
    esg_score: f64,
    settings: &OptimizerSettings,
) -> (Holding, bool) {
    let mut holding = Holding::new(symbol, esg_score);

    let returns = compute_returns(prices);
    let (Some(mean_return), Some(volatility)) = (
        stats::mean(returns.values()),
        stats::sample_std(returns.values()),
    ) else {
        tracing::warn!(
            symbol = %holding.symbol,
            observations = prices.len(),
            "price history unusable, holding gets zero weight"
        );
        return (holding, false);
    };

    holding.mean_return = mean_return;
    holding.volatility = volatility;
    holding.combined_score =
        settings.returns_weight * mean_return + settings.sustainability_weight * esg_score;

    (holding, true)
}

/// Build an ESG-weighted portfolio from an ETF's holdings.
///
/// Holdings with empty or unusable price history stay in the result with
/// zero score and weight, and are listed in `unusable_symbols`. The returned
/// holdings are sorted by combined score, best first; ties keep input order.
///
/// Portfolio volatility is `100 * sqrt(sum(w_i * vol_i))`. This is a
/// simplified figure without covariance terms, not the textbook portfolio
/// standard deviation.
///
/// # Errors
///
/// * [`Error::InvalidWeights`] if the blend factors do not sum to 1.0
/// * [`Error::InvalidInput`] if a symbol appears twice or has a non-finite ESG score
/// * [`Error::DegenerateOptimization`] if the combined scores sum to zero or
///   to a non-finite total
pub fn optimize<P>(
    holdings: &[(String, PriceSeries)],
    esg: &P,
    sustainability_weight: f64,
    returns_weight: f64,
) -> Result<PortfolioResult>
where
    P: SustainabilityProvider + ?Sized,
{
    let settings = OptimizerSettings {
        sustainability_weight,
        returns_weight,
    };
    settings.validate()?;

    let mut seen = HashSet::with_capacity(holdings.len());
    let mut esg_scores = Vec::with_capacity(holdings.len());
    for (symbol, _) in holdings {
        if !seen.insert(normalize_symbol(symbol)) {
            return Err(Error::InvalidInput(format!(
                "duplicate holding symbol: {}",
                symbol
            )));
        }

        let score = esg.score_or_default(symbol);
        if !score.is_finite() {
            return Err(Error::InvalidInput(format!(
                "ESG score for {} must be finite, got {}",
                symbol, score
            )));
        }
        esg_scores.push(score);
    }

    let evaluated: Vec<(Holding, bool)> = holdings
        .par_iter()
        .zip(esg_scores.par_iter())
        .map(|((symbol, prices), &score)| evaluate_holding(symbol, prices, score, &settings))
        .collect();

    let unusable_symbols: Vec<String> = evaluated
        .iter()
        .filter(|(_, usable)| !usable)
        .map(|(h, _)| h.symbol.clone())
        .collect();
    let mut holdings: Vec<Holding> = evaluated.into_iter().map(|(h, _)| h).collect();

    let total_score: f64 = holdings.iter().map(|h| h.combined_score).sum();
    if total_score == 0.0 || !total_score.is_finite() {
        return Err(Error::DegenerateOptimization);
    }

    for holding in &mut holdings {
        holding.weight = Some(holding.combined_score / total_score);
    }

    let weighted_return: f64 = holdings
        .iter()
        .map(|h| h.weight.unwrap_or(0.0) * h.mean_return)
        .sum();
    let weighted_volatility: f64 = holdings
        .iter()
        .map(|h| h.weight.unwrap_or(0.0) * h.volatility)
        .sum();

    holdings.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(
        holdings = holdings.len(),
        unusable = unusable_symbols.len(),
        total_score,
        "optimized sustainable portfolio"
    );

    Ok(PortfolioResult {
        holdings,
        expected_return_pct: weighted_return * 100.0,
        volatility_pct: weighted_volatility.sqrt() * 100.0,
        unusable_symbols,
    })
}
