//! Price-to-return transformation.

use crate::types::{PriceSeries, ReturnSeries};
use std::cmp::Ordering;

/// Simple percentage change between consecutive prices.
///
/// Returns one value fewer than the input; empty for fewer than two prices.
pub fn pct_change(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Convert a price series into fractional returns.
///
/// Each return is stamped with the timestamp of the later price. Series with
/// fewer than two observations yield an empty return series.
pub fn compute_returns(prices: &PriceSeries) -> ReturnSeries {
    let returns = pct_change(&prices.closes());
    prices
        .points()
        .iter()
        .skip(1)
        .map(|p| p.timestamp)
        .zip(returns)
        .collect()
}

/// Intersect two return series by timestamp.
///
/// Returns the paired values for the dates present in both series, in time
/// order. Risk operations never align on their own; callers use this first.
pub fn align_returns(a: &ReturnSeries, b: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let (ta, ra) = (a.timestamps(), a.values());
    let (tb, rb) = (b.timestamps(), b.values());

    let mut left = Vec::with_capacity(ta.len().min(tb.len()));
    let mut right = Vec::with_capacity(ta.len().min(tb.len()));

    let (mut i, mut j) = (0, 0);
    while i < ta.len() && j < tb.len() {
        match ta[i].cmp(&tb[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                left.push(ra[i]);
                right.push(rb[j]);
                i += 1;
                j += 1;
            }
        }
    }

    (left, right)
}
