//! Market data interface.
//!
//! Defines what the analytics need from a market-data source and ships a
//! JSON-file-backed implementation.

mod dataset;

pub use dataset::{list_available_tickers, Dataset, MarketDataProvider, AVAILABLE_ETF_TICKERS};
