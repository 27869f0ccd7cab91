//! StatArb - Pairs-Trading Research Pipeline
//!
//! A research-and-evaluation pipeline for statistical-arbitrage pairs
//! trading: scan a price panel for cointegrated pairs, track each pair's
//! spread with a recursive hedge-ratio filter, generate z-score signals,
//! backtest them with realistic frictions, and reduce the results to
//! summary performance metrics.
//!
//! The stages are composable on their own; [`pipeline::run`] wires them
//! together end to end.

pub mod backtest;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod panel;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod signal;
pub mod types;

pub use config::StrategyConfig;
pub use error::{PairFailure, StatArbError};
pub use panel::PricePanel;
pub use pipeline::{CancelFlag, RunReport};
pub use types::{PairId, PositionState, Regime};
