//! ESG score lookup with a neutral fallback.

use crate::types::{normalize_symbol, EsgSummary, Holding};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Neutral mid-scale score for symbols without a rating.
pub const DEFAULT_ESG_SCORE: f64 = 50.0;

/// Source of per-symbol sustainability scores.
///
/// Implementations must be shareable across threads; per-holding scoring is
/// fanned out in parallel.
pub trait SustainabilityProvider: Sync {
    /// Score for `symbol`, if the source rates it.
    fn esg_score(&self, symbol: &str) -> Option<f64>;

    /// Score assumed for unrated symbols.
    fn default_score(&self) -> f64 {
        DEFAULT_ESG_SCORE
    }

    /// Score for `symbol`, falling back to [`default_score`](Self::default_score).
    fn score_or_default(&self, symbol: &str) -> f64 {
        self.esg_score(symbol)
            .unwrap_or_else(|| self.default_score())
    }
}

/// In-memory ESG score table.
///
/// Keys are normalized symbols; every score, including the fallback, is finite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "EsgTable", into = "EsgTable")]
pub struct EsgScores {
    scores: HashMap<String, f64>,
    default_score: f64,
}

/// Serialized layout of an [`EsgScores`] table.
#[derive(Serialize, Deserialize)]
struct EsgTable {
    #[serde(default)]
    scores: HashMap<String, f64>,
    #[serde(default = "default_esg_score")]
    default_score: f64,
}

fn default_esg_score() -> f64 {
    DEFAULT_ESG_SCORE
}

fn check_score(symbol: &str, score: f64) -> Result<()> {
    if score.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "ESG score for {} must be finite, got {}",
            symbol, score
        )))
    }
}

/// Sample ratings for a handful of large-cap constituents.
static REFERENCE_SCORES: LazyLock<Vec<(&'static str, f64)>> = LazyLock::new(|| {
    vec![
        ("AAPL", 80.0),
        ("MSFT", 85.0),
        ("AMZN", 75.0),
        ("GOOGL", 90.0),
        ("GOOG", 90.0),
        ("LRCX", 70.0),
        ("AVGO", 65.0),
        ("ASML", 88.0),
        ("TT", 82.0),
    ]
});

impl EsgScores {
    /// Create an empty table with the given fallback score.
    pub fn new(default_score: f64) -> Result<Self> {
        check_score("unrated symbols", default_score)?;
        Ok(Self {
            scores: HashMap::new(),
            default_score,
        })
    }

    /// Build a table from `(symbol, score)` pairs.
    pub fn from_pairs<I, S>(pairs: I, default_score: f64) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = Self::new(default_score)?;
        for (symbol, score) in pairs {
            table.insert(symbol.as_ref(), score)?;
        }
        Ok(table)
    }

    /// The sample ratings table, with the neutral default.
    pub fn reference_table() -> Self {
        Self {
            scores: REFERENCE_SCORES
                .iter()
                .map(|(symbol, score)| (symbol.to_string(), *score))
                .collect(),
            default_score: DEFAULT_ESG_SCORE,
        }
    }

    /// Set the score for a symbol.
    pub fn insert(&mut self, symbol: &str, score: f64) -> Result<()> {
        check_score(symbol, score)?;
        self.scores.insert(normalize_symbol(symbol), score);
        Ok(())
    }

    /// Change the fallback score.
    pub fn with_default(mut self, default_score: f64) -> Result<Self> {
        check_score("unrated symbols", default_score)?;
        self.default_score = default_score;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Default for EsgScores {
    fn default() -> Self {
        Self {
            scores: HashMap::new(),
            default_score: DEFAULT_ESG_SCORE,
        }
    }
}

impl TryFrom<EsgTable> for EsgScores {
    type Error = Error;

    fn try_from(table: EsgTable) -> Result<Self> {
        Self::from_pairs(table.scores, table.default_score)
    }
}

impl From<EsgScores> for EsgTable {
    fn from(table: EsgScores) -> Self {
        Self {
            scores: table.scores,
            default_score: table.default_score,
        }
    }
}

impl SustainabilityProvider for EsgScores {
    fn esg_score(&self, symbol: &str) -> Option<f64> {
        self.scores.get(&normalize_symbol(symbol)).copied()
    }

    fn default_score(&self) -> f64 {
        self.default_score
    }
}

/// Attach ESG scores to a holdings list and compute their mean.
pub fn score_holdings<S, P>(symbols: &[S], provider: &P) -> Result<EsgSummary>
where
    S: AsRef<str>,
    P: SustainabilityProvider + ?Sized,
{
    if symbols.is_empty() {
        return Err(Error::InsufficientData(
            "cannot score an empty holdings table".to_string(),
        ));
    }

    let holdings: Vec<Holding> = symbols
        .iter()
        .map(|s| Holding::new(s.as_ref(), provider.score_or_default(s.as_ref())))
        .collect();

    let mean_score = holdings.iter().map(|h| h.esg_score).sum::<f64>() / holdings.len() as f64;

    Ok(EsgSummary {
        mean_score,
        holdings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_for_unknown_symbol() {
        let scores = EsgScores::reference_table();
        assert_eq!(scores.score_or_default("MSFT"), 85.0);
        assert_eq!(scores.score_or_default("msft"), 85.0);
        assert_eq!(scores.score_or_default("ZZZZ"), 50.0);
    }

    #[test]
    fn test_configurable_default() {
        let scores = EsgScores::from_pairs([("XYZ", 10.0)], 40.0).unwrap();
        assert_eq!(scores.score_or_default("XYZ"), 10.0);
        assert_eq!(scores.score_or_default("ABC"), 40.0);

        let scores = scores.with_default(0.0).unwrap();
        assert_eq!(scores.score_or_default("ABC"), 0.0);
    }

    #[test]
    fn test_rejects_non_finite_default() {
        assert!(matches!(EsgScores::new(f64::NAN), Err(Error::InvalidInput(_))));
        assert!(matches!(
            EsgScores::reference_table().with_default(f64::INFINITY),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_json_table_is_normalized() {
        let json = r#"{"scores": {"aapl": 80.0, " msft ": 85.0}, "default_score": 40.0}"#;
        let scores: EsgScores = serde_json::from_str(json).unwrap();

        assert_eq!(scores.score_or_default("aapl"), 80.0);
        assert_eq!(scores.score_or_default("MSFT"), 85.0);
        assert_eq!(scores.score_or_default("TSLA"), 40.0);

        let defaulted: EsgScores = serde_json::from_str(r#"{"scores": {}}"#).unwrap();
        assert_eq!(defaulted.score_or_default("TSLA"), DEFAULT_ESG_SCORE);

        let roundtrip: EsgScores =
            serde_json::from_str(&serde_json::to_string(&scores).unwrap()).unwrap();
        assert_eq!(roundtrip, scores);
    }

    #[test]
    fn test_rejects_non_finite_score() {
        let result = EsgScores::from_pairs([("XYZ", f64::NAN)], 50.0);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_score_holdings() {
        let scores = EsgScores::reference_table();
        let summary = score_holdings(&["AAPL", "GOOGL", "NOPE"], &scores).unwrap();

        assert_eq!(summary.holdings.len(), 3);
        assert_eq!(summary.holdings[2].esg_score, 50.0);
        assert!((summary.mean_score - 220.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_holdings_empty() {
        let symbols: [&str; 0] = [];
        let result = score_holdings(&symbols, &EsgScores::default());
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }
}
