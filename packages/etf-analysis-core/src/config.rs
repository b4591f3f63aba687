//! Analysis configuration loading.

use crate::analytics::{RiskSettings, DEFAULT_CONFIDENCE_LEVEL, TRADING_DAYS_PER_YEAR};
use crate::esg::{EsgScores, DEFAULT_ESG_SCORE};
use crate::market::list_available_tickers;
use crate::portfolio::OptimizerSettings;
use crate::types::normalize_symbol;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by every analysis call.
///
/// Every field has a default, so a config file only needs the values it changes:
///
/// ```toml
/// benchmark = "^GSPC"
/// confidence_level = 0.99
///
/// [esg_scores]
/// AAPL = 80
/// MSFT = 85
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Periods per year for annualization
    pub periods_per_year: u32,
    /// Confidence level for VaR and CVaR
    pub confidence_level: f64,
    /// Benchmark symbol for beta and alpha
    pub benchmark: String,
    /// ESG score for unrated symbols
    pub default_esg_score: f64,
    /// Optimizer weight on the ESG score
    pub sustainability_weight: f64,
    /// Optimizer weight on mean return
    pub returns_weight: f64,
    /// ETF tickers accepted by the analyzer
    pub universe: Vec<String>,
    /// Per-symbol ESG ratings
    pub esg_scores: BTreeMap<String, f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            benchmark: "^GSPC".to_string(),
            default_esg_score: DEFAULT_ESG_SCORE,
            sustainability_weight: 0.5,
            returns_weight: 0.5,
            universe: list_available_tickers(),
            esg_scores: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.etf-analysis/config.toml`
    /// Can be overridden with `ETF_ANALYSIS_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("ETF_ANALYSIS_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".etf-analysis/config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load and validate a config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.periods_per_year == 0 {
            return Err(Error::Config("periods_per_year must be positive".to_string()));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(Error::Config(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.benchmark.trim().is_empty() {
            return Err(Error::Config("benchmark must not be empty".to_string()));
        }
        if !self.default_esg_score.is_finite() {
            return Err(Error::Config("default_esg_score must be finite".to_string()));
        }
        self.optimizer_settings()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Risk report settings.
    pub fn risk_settings(&self) -> RiskSettings {
        RiskSettings {
            periods_per_year: self.periods_per_year,
            confidence_level: self.confidence_level,
        }
    }

    /// Default optimizer blend.
    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            sustainability_weight: self.sustainability_weight,
            returns_weight: self.returns_weight,
        }
    }

    /// ESG score table from the `[esg_scores]` section.
    pub fn esg_table(&self) -> Result<EsgScores> {
        EsgScores::from_pairs(
            self.esg_scores.iter().map(|(s, v)| (s.as_str(), *v)),
            self.default_esg_score,
        )
    }

    /// Whether `etf` is in the configured universe.
    pub fn is_in_universe(&self, etf: &str) -> bool {
        let etf = normalize_symbol(etf);
        self.universe.iter().any(|t| normalize_symbol(t) == etf)
    }
}
