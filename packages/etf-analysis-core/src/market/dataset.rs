//! File-backed market data: ETF holdings lists and price histories.

use crate::types::{normalize_symbol, PriceSeries};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// ETFs covered by the analysis toolkit.
pub const AVAILABLE_ETF_TICKERS: [&str; 7] = ["NWLG", "JGRO", "ESGY", "QQMG", "NULG", "LRGE", "HAPI"];

/// List the ETF tickers the toolkit is set up for.
pub fn list_available_tickers() -> Vec<String> {
    AVAILABLE_ETF_TICKERS.iter().map(|t| t.to_string()).collect()
}

/// Source of holdings lists and price histories.
///
/// This is the seam to whatever acquires market data; the analytics only see
/// already-parsed tables.
pub trait MarketDataProvider: Sync {
    /// Constituent symbols of an ETF, in table order.
    fn holdings(&self, etf: &str) -> Result<Vec<String>>;

    /// Closing price history for a symbol.
    fn price_history(&self, symbol: &str) -> Result<PriceSeries>;
}

/// Market data snapshot persisted as JSON.
///
/// ```json
/// {
///   "holdings": { "NWLG": ["AAPL", "MSFT"] },
///   "prices": { "AAPL": [{ "timestamp": "2024-01-02T00:00:00Z", "close": 185.6 }] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    /// ETF ticker -> constituent symbols
    #[serde(default)]
    pub holdings: BTreeMap<String, Vec<String>>,
    /// Symbol -> price history
    #[serde(default)]
    pub prices: BTreeMap<String, PriceSeries>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default dataset file path.
    ///
    /// Default path: `~/.etf-analysis/dataset.json`
    /// Can be overridden with `ETF_ANALYSIS_DATASET` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("ETF_ANALYSIS_DATASET") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".etf-analysis/dataset.json"))
            .unwrap_or_else(|| PathBuf::from("dataset.json"))
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load a dataset file. Symbols are normalized to uppercase.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidInput(format!(
                "dataset not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let raw: Dataset = serde_json::from_str(&content)?;

        let mut dataset = Self::new();
        for (etf, symbols) in raw.holdings {
            dataset.insert_holdings(&etf, symbols);
        }
        for (symbol, series) in raw.prices {
            dataset.insert_prices(&symbol, series);
        }

        tracing::debug!(
            path = %path.display(),
            etfs = dataset.holdings.len(),
            symbols = dataset.prices.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Save the dataset as pretty-printed JSON.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Set the holdings list of an ETF.
    pub fn insert_holdings<S: AsRef<str>>(&mut self, etf: &str, symbols: Vec<S>) {
        let symbols = symbols.iter().map(|s| normalize_symbol(s.as_ref())).collect();
        self.holdings.insert(normalize_symbol(etf), symbols);
    }

    /// Set the price history of a symbol.
    pub fn insert_prices(&mut self, symbol: &str, series: PriceSeries) {
        self.prices.insert(normalize_symbol(symbol), series);
    }

    /// ETFs with a holdings list.
    pub fn etfs(&self) -> Vec<&str> {
        self.holdings.keys().map(String::as_str).collect()
    }
}

impl MarketDataProvider for Dataset {
    fn holdings(&self, etf: &str) -> Result<Vec<String>> {
        let etf = normalize_symbol(etf);
        self.holdings
            .get(&etf)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no holdings for ETF {}", etf)))
    }

    fn price_history(&self, symbol: &str) -> Result<PriceSeries> {
        let symbol = normalize_symbol(symbol);
        self.prices
            .get(&symbol)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no price history for {}", symbol)))
    }
}
