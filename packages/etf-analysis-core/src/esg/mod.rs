//! Sustainability (ESG) scoring.
//!
//! Scores come from an injected [`SustainabilityProvider`]; the core never
//! bakes in a ratings source.

mod scores;

pub use scores::{score_holdings, EsgScores, SustainabilityProvider, DEFAULT_ESG_SCORE};
