//! ETF comparison and ranking.

use crate::types::{
    normalize_symbol, Holding, Period, PriceSeries, RankedEntry, Ranking, RankingMetric,
    SymbolFailure,
};
use crate::{Error, Result};
use rayon::prelude::*;

/// Cumulative return over the whole series, in percent.
pub fn cumulative_return(prices: &PriceSeries) -> Result<f64> {
    match (prices.first(), prices.last()) {
        (Some(first), Some(last)) if prices.len() >= 2 => {
            Ok((last.close / first.close - 1.0) * 100.0)
        }
        _ => Err(Error::InsufficientData(format!(
            "cumulative return needs at least 2 prices, got {}",
            prices.len()
        ))),
    }
}

/// Mean ESG score of a holdings table.
fn mean_esg(holdings: &[Holding]) -> Result<f64> {
    if holdings.is_empty() {
        return Err(Error::InsufficientData(
            "holdings table is empty".to_string(),
        ));
    }
    Ok(holdings.iter().map(|h| h.esg_score).sum::<f64>() / holdings.len() as f64)
}

/// Sort successful results descending (stable) and collect failures.
fn into_ranking(metric: RankingMetric, results: Vec<(String, Result<f64>)>) -> Ranking {
    let mut entries = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (symbol, result) in results {
        match result {
            Ok(value) => entries.push(RankedEntry { symbol, value }),
            Err(error) => {
                tracing::warn!(symbol = %symbol, error = %error, "symbol excluded from ranking");
                failures.push(SymbolFailure { symbol, error });
            }
        }
    }

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ranking {
        metric,
        entries,
        failures,
    }
}

/// Rank symbols by cumulative return over `period`, best first.
///
/// A symbol with fewer than two prices in the window is reported in
/// `failures`; the others are still ranked.
pub fn rank_by_cumulative_return(
    prices_by_symbol: &[(String, PriceSeries)],
    period: Period,
) -> Ranking {
    let results = prices_by_symbol
        .par_iter()
        .map(|(symbol, prices)| {
            (
                normalize_symbol(symbol),
                cumulative_return(&prices.window(period)),
            )
        })
        .collect();

    into_ranking(RankingMetric::CumulativeReturnPct, results)
}

/// Rank symbols by the mean ESG score of their holdings, best first.
pub fn rank_by_mean_esg(holdings_by_symbol: &[(String, Vec<Holding>)]) -> Ranking {
    let results = holdings_by_symbol
        .par_iter()
        .map(|(symbol, holdings)| (normalize_symbol(symbol), mean_esg(holdings)))
        .collect();

    into_ranking(RankingMetric::MeanEsgScore, results)
}
