//! ETF analysis CLI - risk, sustainability and ranking reports.
//!
//! Every command prints an `ApiResponse` as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etf_analysis_core::{
    list_available_tickers, AnalysisConfig, ApiResponse, Dataset, EsgScores, EtfAnalyzer, Period,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "etf-analysis")]
#[command(about = "ETF risk metrics, ESG-aware portfolio weighting and ranking")]
#[command(version)]
struct Cli {
    /// Market data file (defaults to ~/.etf-analysis/dataset.json)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Config file (defaults to ~/.etf-analysis/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Score holdings with the bundled sample ESG table instead of the config
    #[arg(long, global = true)]
    reference_esg: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported ETF tickers
    Tickers,
    /// Beta, Sharpe ratio and max drawdown of an ETF
    Risk {
        /// ETF ticker
        etf: String,
        /// Include VaR, CVaR and alpha
        #[arg(long)]
        full: bool,
        /// Report every holding instead of the ETF itself
        #[arg(long)]
        holdings: bool,
    },
    /// Historical value at risk
    Var {
        etf: String,
        /// Confidence level (0.95 = 95%)
        #[arg(short, long)]
        confidence: Option<f64>,
    },
    /// Historical conditional value at risk
    Cvar {
        etf: String,
        /// Confidence level (0.95 = 95%)
        #[arg(short, long)]
        confidence: Option<f64>,
    },
    /// Alpha and beta against a benchmark
    AlphaBeta {
        etf: String,
        /// Benchmark symbol (defaults to the configured benchmark)
        #[arg(short, long)]
        benchmark: Option<String>,
    },
    /// Rank ETFs by cumulative return
    Compare {
        /// ETF tickers (defaults to all supported tickers)
        etfs: Vec<String>,
        /// Lookback period: 1mo, 3mo, 6mo, 1y, 2y, 5y, ytd, max
        #[arg(short, long, default_value = "1y")]
        period: Period,
    },
    /// ESG scores of an ETF's holdings
    Esg { etf: String },
    /// ESG-weighted portfolio of an ETF's holdings
    Optimize {
        etf: String,
        /// Weight on the ESG score
        #[arg(short, long)]
        sustainability_weight: Option<f64>,
        /// Weight on mean return
        #[arg(short, long)]
        returns_weight: Option<f64>,
    },
    /// Rank ETFs by mean ESG score of their holdings
    CompareEsg {
        /// ETF tickers (defaults to all supported tickers)
        etfs: Vec<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (response, code) = match run(cli) {
        Ok(data) => (ApiResponse::ok(data), ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "command failed");
            (ApiResponse::err(format!("{:#}", e)), ExitCode::FAILURE)
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(output) => {
            println!("{}", output);
            code
        }
        Err(e) => {
            eprintln!("failed to encode response: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    if let Commands::Tickers = cli.command {
        return Ok(json!({ "tickers": list_available_tickers() }));
    }

    let config_path = cli.config.unwrap_or_else(AnalysisConfig::default_path);
    let config = AnalysisConfig::load_from_path(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let dataset_path = cli.dataset.unwrap_or_else(Dataset::default_path);
    let dataset = Dataset::load_from_path(&dataset_path)
        .with_context(|| format!("loading dataset {}", dataset_path.display()))?;

    let esg = if cli.reference_esg {
        EsgScores::reference_table().with_default(config.default_esg_score)?
    } else {
        config.esg_table()?
    };

    let analyzer = EtfAnalyzer::new(&dataset, &esg, config);
    let confidence_or_default = |c: Option<f64>| c.unwrap_or(analyzer.config().confidence_level);

    let data = match cli.command {
        Commands::Tickers => json!({ "tickers": list_available_tickers() }),
        Commands::Risk {
            etf,
            full: _,
            holdings: true,
        } => {
            let report: Vec<Value> = analyzer
                .holdings_risk_report(&etf)?
                .into_iter()
                .map(|(symbol, result)| match result {
                    Ok(metrics) => json!({ "symbol": symbol, "metrics": metrics }),
                    Err(e) => json!({ "symbol": symbol, "error": e.to_string() }),
                })
                .collect();
            json!({ "etf": etf, "holdings": report })
        }
        Commands::Risk {
            etf, full: true, ..
        } => serde_json::to_value(analyzer.full_risk_metrics(&etf)?)?,
        Commands::Risk { etf, .. } => serde_json::to_value(analyzer.risk_metrics(&etf)?)?,
        Commands::Var { etf, confidence } => {
            let confidence = confidence_or_default(confidence);
            let var = analyzer.value_at_risk(&etf, confidence)?;
            json!({ "etf": etf, "confidence_level": confidence, "value_at_risk": var })
        }
        Commands::Cvar { etf, confidence } => {
            let confidence = confidence_or_default(confidence);
            let cvar = analyzer.conditional_value_at_risk(&etf, confidence)?;
            json!({ "etf": etf, "confidence_level": confidence, "conditional_value_at_risk": cvar })
        }
        Commands::AlphaBeta { etf, benchmark } => {
            serde_json::to_value(analyzer.alpha_beta(&etf, benchmark.as_deref())?)?
        }
        Commands::Compare { etfs, period } => {
            let etfs = or_all_tickers(etfs);
            let ranking = analyzer.compare_performance(&etfs, period);
            json!({ "period": period, "ranking": ranking })
        }
        Commands::Esg { etf } => serde_json::to_value(analyzer.sustainability_scores(&etf)?)?,
        Commands::Optimize {
            etf,
            sustainability_weight,
            returns_weight,
        } => {
            let defaults = analyzer.config().optimizer_settings();
            let result = analyzer.optimize_sustainable_portfolio(
                &etf,
                sustainability_weight.unwrap_or(defaults.sustainability_weight),
                returns_weight.unwrap_or(defaults.returns_weight),
            )?;
            serde_json::to_value(result)?
        }
        Commands::CompareEsg { etfs } => {
            let etfs = or_all_tickers(etfs);
            serde_json::to_value(analyzer.compare_esg_ratings(&etfs))?
        }
    };

    Ok(data)
}

fn or_all_tickers(etfs: Vec<String>) -> Vec<String> {
    if etfs.is_empty() {
        list_available_tickers()
    } else {
        etfs
    }
}
