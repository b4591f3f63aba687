//! ETF-level analysis on top of the market data and ESG providers.
//!
//! [`EtfAnalyzer`] fetches what each operation needs from a
//! [`MarketDataProvider`] and hands it to the pure analytics.

use crate::analytics::{
    self, align_returns, calculate_full_risk_metrics, calculate_risk_metrics,
    calculate_risk_metrics_batch, compute_returns,
};
use crate::config::AnalysisConfig;
use crate::esg::{score_holdings, SustainabilityProvider};
use crate::market::MarketDataProvider;
use crate::portfolio::{optimize, rank_by_cumulative_return, rank_by_mean_esg};
use crate::types::{
    normalize_symbol, AlphaBeta, EsgSummary, Holding, Period, PortfolioResult, PriceSeries,
    Ranking, RiskMetrics, SymbolFailure,
};
use crate::{Error, Result};
use rayon::prelude::*;

/// Runs analyses for ETF tickers.
pub struct EtfAnalyzer<'a, M: ?Sized, S: ?Sized> {
    market: &'a M,
    esg: &'a S,
    config: AnalysisConfig,
}

impl<'a, M, S> EtfAnalyzer<'a, M, S>
where
    M: MarketDataProvider + ?Sized,
    S: SustainabilityProvider + ?Sized,
{
    /// Create an analyzer over the given providers.
    pub fn new(market: &'a M, esg: &'a S, config: AnalysisConfig) -> Self {
        Self {
            market,
            esg,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn check_universe(&self, etf: &str) -> Result<String> {
        if self.config.is_in_universe(etf) {
            Ok(normalize_symbol(etf))
        } else {
            Err(Error::InvalidInput(format!(
                "ticker {} is not available",
                normalize_symbol(etf)
            )))
        }
    }

    fn benchmark_prices(&self) -> Result<PriceSeries> {
        self.market.price_history(&self.config.benchmark)
    }

    /// Beta, Sharpe ratio and max drawdown against the configured benchmark.
    pub fn risk_metrics(&self, etf: &str) -> Result<RiskMetrics> {
        let prices = self.market.price_history(etf)?;
        let benchmark = self.benchmark_prices()?;
        calculate_risk_metrics(&prices, &benchmark, self.config.periods_per_year)
    }

    /// Risk metrics plus VaR, CVaR and alpha at the configured confidence.
    pub fn full_risk_metrics(&self, etf: &str) -> Result<RiskMetrics> {
        let prices = self.market.price_history(etf)?;
        let benchmark = self.benchmark_prices()?;
        calculate_full_risk_metrics(&prices, &benchmark, &self.config.risk_settings())
    }

    /// Full risk report for every holding of an ETF.
    pub fn holdings_risk_report(&self, etf: &str) -> Result<Vec<(String, Result<RiskMetrics>)>> {
        let etf = self.check_universe(etf)?;
        let symbols = self.market.holdings(&etf)?;
        let benchmark = self.benchmark_prices()?;

        let mut report = Vec::with_capacity(symbols.len());
        let mut fetched = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.market.price_history(&symbol) {
                Ok(prices) => fetched.push((symbol, prices)),
                Err(e) => report.push((symbol, Err(e))),
            }
        }

        report.extend(calculate_risk_metrics_batch(
            &fetched,
            &benchmark,
            &self.config.risk_settings(),
        ));
        Ok(report)
    }

    /// Historical VaR of an ETF's returns.
    pub fn value_at_risk(&self, etf: &str, confidence: f64) -> Result<f64> {
        let returns = compute_returns(&self.market.price_history(etf)?);
        analytics::value_at_risk(returns.values(), confidence)
    }

    /// Historical CVaR of an ETF's returns.
    pub fn conditional_value_at_risk(&self, etf: &str, confidence: f64) -> Result<f64> {
        let returns = compute_returns(&self.market.price_history(etf)?);
        analytics::conditional_value_at_risk(returns.values(), confidence)
    }

    /// Alpha and beta against `benchmark`, or the configured benchmark.
    pub fn alpha_beta(&self, etf: &str, benchmark: Option<&str>) -> Result<AlphaBeta> {
        let returns = compute_returns(&self.market.price_history(etf)?);
        let benchmark_prices = match benchmark {
            Some(symbol) => self.market.price_history(symbol)?,
            None => self.benchmark_prices()?,
        };
        let benchmark_returns = compute_returns(&benchmark_prices);

        let (aligned, aligned_benchmark) = align_returns(&returns, &benchmark_returns);
        analytics::alpha_beta(&aligned, &aligned_benchmark)
    }

    /// Rank ETFs by cumulative return over `period`.
    pub fn compare_performance<T: AsRef<str>>(&self, etfs: &[T], period: Period) -> Ranking {
        let mut series = Vec::with_capacity(etfs.len());
        let mut failures = Vec::new();

        for etf in etfs {
            let symbol = normalize_symbol(etf.as_ref());
            match self.market.price_history(&symbol) {
                Ok(prices) => series.push((symbol, prices)),
                Err(error) => failures.push(SymbolFailure { symbol, error }),
            }
        }

        let mut ranking = rank_by_cumulative_return(&series, period);
        failures.append(&mut ranking.failures);
        ranking.failures = failures;
        ranking
    }

    /// ESG scores of an ETF's holdings and their mean.
    pub fn sustainability_scores(&self, etf: &str) -> Result<EsgSummary> {
        let etf = self.check_universe(etf)?;
        let symbols = self.market.holdings(&etf)?;
        score_holdings(&symbols, self.esg)
    }

    /// ESG-weighted portfolio of an ETF's holdings.
    ///
    /// A holding whose price history cannot be fetched takes part with an
    /// empty series, so it stays in the table with zero weight.
    pub fn optimize_sustainable_portfolio(
        &self,
        etf: &str,
        sustainability_weight: f64,
        returns_weight: f64,
    ) -> Result<PortfolioResult> {
        crate::portfolio::OptimizerSettings {
            sustainability_weight,
            returns_weight,
        }
        .validate()?;

        let etf = self.check_universe(etf)?;
        let symbols = self.market.holdings(&etf)?;

        let holdings: Vec<(String, PriceSeries)> = symbols
            .par_iter()
            .map(|symbol| {
                let prices = self.market.price_history(symbol).unwrap_or_else(|e| {
                    tracing::error!(symbol = %symbol, error = %e, "error retrieving price history");
                    PriceSeries::empty()
                });
                (symbol.clone(), prices)
            })
            .collect();

        optimize(&holdings, self.esg, sustainability_weight, returns_weight)
    }

    /// Optimize with the configured blend.
    pub fn optimize_with_defaults(&self, etf: &str) -> Result<PortfolioResult> {
        self.optimize_sustainable_portfolio(
            etf,
            self.config.sustainability_weight,
            self.config.returns_weight,
        )
    }

    /// Rank ETFs by the mean ESG score of their holdings.
    pub fn compare_esg_ratings<T: AsRef<str>>(&self, etfs: &[T]) -> Ranking {
        let mut tables: Vec<(String, Vec<Holding>)> = Vec::with_capacity(etfs.len());
        let mut failures = Vec::new();

        for etf in etfs {
            let symbol = normalize_symbol(etf.as_ref());
            match self.sustainability_scores(&symbol) {
                Ok(summary) => tables.push((symbol, summary.holdings)),
                Err(error) => failures.push(SymbolFailure { symbol, error }),
            }
        }

        let mut ranking = rank_by_mean_esg(&tables);
        failures.append(&mut ranking.failures);
        ranking.failures = failures;
        ranking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esg::EsgScores;
    use crate::market::Dataset;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        PriceSeries::from_daily_closes(start, closes).unwrap()
    }

    fn dataset() -> Dataset {
        let mut data = Dataset::new();
        data.insert_holdings("NWLG", vec!["AAPL", "MSFT", "MISSING"]);
        data.insert_holdings("JGRO", vec!["GOOGL", "AVGO"]);
        data.insert_holdings("ESGY", Vec::<String>::new());

        data.insert_prices("^GSPC", series(&[4700.0, 4720.0, 4690.0, 4750.0, 4730.0, 4770.0]));
        data.insert_prices("NWLG", series(&[30.0, 30.4, 30.1, 30.9, 30.6, 31.2]));
        data.insert_prices("JGRO", series(&[60.0, 59.0, 58.5, 59.5, 58.0, 57.0]));
        data.insert_prices("AAPL", series(&[185.0, 186.0, 183.5, 188.0, 187.0, 190.0]));
        data.insert_prices("MSFT", series(&[370.0, 372.0, 368.0, 376.0, 374.0, 380.0]));
        data.insert_prices("GOOGL", series(&[140.0, 141.0, 139.0, 142.0, 143.0, 144.0]));
        data.insert_prices("AVGO", series(&[1100.0, 1110.0, 1090.0, 1120.0, 1115.0, 1130.0]));
        data
    }

    #[test]
    fn test_risk_metrics() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let metrics = analyzer.risk_metrics("NWLG").unwrap();
        assert!(metrics.beta > 0.0);
        assert!(metrics.max_drawdown <= 0.0);

        let full = analyzer.full_risk_metrics("NWLG").unwrap();
        assert_eq!(full.beta, metrics.beta);
        assert!(full.value_at_risk.is_some());
    }

    #[test]
    fn test_unknown_ticker() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        assert!(matches!(
            analyzer.risk_metrics("NOPE"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            analyzer.sustainability_scores("INVALID"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_var_and_cvar() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let var = analyzer.value_at_risk("JGRO", 0.95).unwrap();
        let cvar = analyzer.conditional_value_at_risk("JGRO", 0.95).unwrap();
        assert!(var < 0.0);
        assert!(cvar <= var);
    }

    #[test]
    fn test_alpha_beta_against_self() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let ab = analyzer.alpha_beta("NWLG", Some("NWLG")).unwrap();
        assert_relative_eq!(ab.beta, 1.0, epsilon = 1e-12);
        assert_relative_eq!(ab.alpha, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_performance() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let ranking = analyzer.compare_performance(&["JGRO", "NWLG", "ZZZ"], Period::OneYear);

        assert_eq!(ranking.symbols(), vec!["NWLG", "JGRO"]);
        assert_relative_eq!(ranking.value("NWLG").unwrap(), 4.0, epsilon = 1e-9);
        assert_eq!(ranking.failures.len(), 1);
        assert_eq!(ranking.failures[0].symbol, "ZZZ");
    }

    #[test]
    fn test_sustainability_scores() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let summary = analyzer.sustainability_scores("nwlg").unwrap();
        assert_eq!(summary.holdings.len(), 3);
        // AAPL 80, MSFT 85, MISSING defaults to 50
        assert_relative_eq!(summary.mean_score, 215.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_optimize_sustainable_portfolio() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let result = analyzer.optimize_with_defaults("NWLG").unwrap();

        assert_eq!(result.holdings.len(), 3);
        assert_eq!(result.unusable_symbols, vec!["MISSING"]);
        assert_eq!(result.holdings[0].symbol, "MSFT");
        assert_eq!(result.holding("MISSING").unwrap().weight, Some(0.0));
        assert_relative_eq!(result.total_weight(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_optimize_checks_weights_first() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let result = analyzer.optimize_sustainable_portfolio("INVALID", 0.9, 0.2);
        assert!(matches!(result, Err(Error::InvalidWeights { .. })));
    }

    #[test]
    fn test_compare_esg_ratings() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let ranking = analyzer.compare_esg_ratings(&["NWLG", "JGRO", "ESGY", "INVALID"]);

        // JGRO: (90 + 65) / 2 = 77.5, NWLG: 71.67
        assert_eq!(ranking.symbols(), vec!["JGRO", "NWLG"]);
        let failed: Vec<&str> = ranking.failures.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(failed, vec!["ESGY", "INVALID"]);
    }

    #[test]
    fn test_holdings_risk_report() {
        let data = dataset();
        let esg = EsgScores::reference_table();
        let analyzer = EtfAnalyzer::new(&data, &esg, AnalysisConfig::default());

        let report = analyzer.holdings_risk_report("NWLG").unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report[0].0, "MISSING");
        assert!(report[0].1.is_err());
        assert!(report[1..].iter().all(|(_, r)| r.is_ok()));
    }
}
