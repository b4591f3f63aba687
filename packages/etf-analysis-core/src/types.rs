//! Core data types for the ETF analysis engine.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Normalize a ticker symbol (trimmed, uppercase).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A single closing price observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Closing price
    pub close: f64,
}

impl PricePoint {
    /// Create a new price point.
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Closing price history for one symbol.
///
/// Timestamps are strictly increasing and every close is finite and positive.
/// An empty series is valid and stands for "no usable history".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a validated price series.
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(Error::InvalidInput(format!(
                    "price at index {} must be finite and positive, got {}",
                    i, point.close
                )));
            }
            if i > 0 && point.timestamp <= points[i - 1].timestamp {
                return Err(Error::InvalidInput(format!(
                    "timestamps must be strictly increasing (index {})",
                    i
                )));
            }
        }
        Ok(Self { points })
    }

    /// An empty series.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series of daily closes starting at `start`.
    pub fn from_daily_closes(start: DateTime<Utc>, closes: &[f64]) -> Result<Self> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint::new(start + Duration::days(i as i64), close))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in time order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Restrict the series to the look-back `period` ending at its last observation.
    pub fn window(&self, period: Period) -> PriceSeries {
        let Some(last) = self.last() else {
            return Self::empty();
        };

        match period.start_from(last.timestamp) {
            Some(cutoff) => Self {
                points: self
                    .points
                    .iter()
                    .filter(|p| p.timestamp >= cutoff)
                    .copied()
                    .collect(),
            },
            None => self.clone(),
        }
    }
}

impl TryFrom<Vec<PricePoint>> for PriceSeries {
    type Error = Error;

    fn try_from(points: Vec<PricePoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

/// Fractional returns derived from a [`PriceSeries`].
///
/// Each return carries the timestamp of the later of its two prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReturnColumns", into = "ReturnColumns")]
pub struct ReturnSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a return series, dropping non-finite observations.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(Error::MisalignedSeries {
                left: timestamps.len(),
                right: values.len(),
            });
        }

        Ok(timestamps.into_iter().zip(values).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(timestamp, return)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }
}

/// Serialized column layout of a [`ReturnSeries`].
#[derive(Serialize, Deserialize)]
struct ReturnColumns {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TryFrom<ReturnColumns> for ReturnSeries {
    type Error = Error;

    fn try_from(columns: ReturnColumns) -> Result<Self> {
        Self::new(columns.timestamps, columns.values)
    }
}

impl From<ReturnSeries> for ReturnColumns {
    fn from(series: ReturnSeries) -> Self {
        Self {
            timestamps: series.timestamps,
            values: series.values,
        }
    }
}

impl FromIterator<(DateTime<Utc>, f64)> for ReturnSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, f64)>>(iter: I) -> Self {
        let (timestamps, values) = iter.into_iter().filter(|(_, r)| r.is_finite()).unzip();
        Self { timestamps, values }
    }
}

/// Look-back window for performance comparisons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Earliest timestamp included in the window ending at `end`, or `None` for
    /// the whole history.
    pub fn start_from(&self, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::OneYear => 12,
            Period::TwoYears => 24,
            Period::FiveYears => 60,
            Period::YearToDate => {
                return Utc.with_ymd_and_hms(end.year(), 1, 1, 0, 0, 0).single();
            }
            Period::Max => return None,
        };
        end.checked_sub_months(Months::new(months))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            other => Err(Error::InvalidInput(format!("unknown period: {}", other))),
        }
    }
}

/// A constituent of an ETF, scored and (after optimization) weighted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Portfolio weight, unset before optimization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Sustainability score (0-100 scale)
    pub esg_score: f64,
    /// Blend of mean return and ESG score
    pub combined_score: f64,
    /// Mean periodic return (fraction)
    pub mean_return: f64,
    /// Standard deviation of periodic returns (fraction)
    pub volatility: f64,
}

impl Holding {
    /// Create an unweighted holding with the given ESG score.
    pub fn new(symbol: &str, esg_score: f64) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            weight: None,
            esg_score,
            combined_score: 0.0,
            mean_return: 0.0,
            volatility: 0.0,
        }
    }
}

/// Risk metrics for one ETF.
///
/// The optional fields are only filled by the full calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Sensitivity to the benchmark
    pub beta: f64,
    /// Annualized Sharpe ratio
    pub sharpe_ratio: f64,
    /// Maximum drawdown as a non-positive fraction
    pub max_drawdown: f64,
    /// Historical Value at Risk (return fraction)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_at_risk: Option<f64>,
    /// Conditional VaR / expected shortfall (return fraction)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_value_at_risk: Option<f64>,
    /// Alpha relative to the benchmark (periodic return fraction)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    /// Confidence level used for VaR and CVaR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
}

/// Alpha and beta against a benchmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlphaBeta {
    pub alpha: f64,
    pub beta: f64,
}

/// Output of the sustainable portfolio optimizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioResult {
    /// Holdings sorted by combined score, best first
    pub holdings: Vec<Holding>,
    /// Weighted mean return in percent
    pub expected_return_pct: f64,
    /// Simplified portfolio volatility in percent
    pub volatility_pct: f64,
    /// Holdings whose price history was empty or unusable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unusable_symbols: Vec<String>,
}

impl PortfolioResult {
    /// Sum of all holding weights.
    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().filter_map(|h| h.weight).sum()
    }

    /// Find a holding by symbol.
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        let symbol = normalize_symbol(symbol);
        self.holdings.iter().find(|h| h.symbol == symbol)
    }
}

/// ESG scores attached to an ETF's holdings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EsgSummary {
    /// Mean ESG score across holdings
    pub mean_score: f64,
    /// Holdings with their ESG scores
    pub holdings: Vec<Holding>,
}

/// Metric a [`Ranking`] is ordered by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    CumulativeReturnPct,
    MeanEsgScore,
}

/// One ranked symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedEntry {
    pub symbol: String,
    pub value: f64,
}

/// A symbol that could not be ranked.
#[derive(Debug, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Error,
}

fn serialize_error<S: Serializer>(
    error: &Error,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Symbols ordered by a metric, best first, plus per-symbol failures.
#[derive(Debug, Serialize)]
pub struct Ranking {
    pub metric: RankingMetric,
    pub entries: Vec<RankedEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SymbolFailure>,
}

impl Ranking {
    /// Ranked symbols in order.
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    /// Value for a ranked symbol.
    pub fn value(&self, symbol: &str) -> Option<f64> {
        let symbol = normalize_symbol(symbol);
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.value)
    }

    /// Whether every requested symbol was ranked.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// JSON envelope printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
