//! Common Types Module
//!
//! Shared types used across the codebase to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Identifies an unordered instrument pair.
///
/// The two symbols are stored in the order they were enumerated from the
/// panel (leg A first), which is stable for a given panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairId {
    /// First leg symbol (the regression's dependent variable).
    pub symbol_a: String,
    /// Second leg symbol (the regression's independent variable).
    pub symbol_b: String,
}

impl PairId {
    pub fn new(symbol_a: impl Into<String>, symbol_b: impl Into<String>) -> Self {
        Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
        }
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol_a, self.symbol_b)
    }
}

/// Discrete position state of a pair strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    /// No open position.
    Flat,
    /// Long leg A, short leg B.
    LongSpread,
    /// Short leg A, long leg B.
    ShortSpread,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "flat"),
            PositionState::LongSpread => write!(f, "long_spread"),
            PositionState::ShortSpread => write!(f, "short_spread"),
        }
    }
}

/// Regime classification of the spread's recent behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Spread is reverting toward its rolling mean; entries are eligible.
    MeanReverting,
    /// Spread is trending; entries are gated or down-weighted.
    Trending,
    /// Not enough history to classify (warmup).
    Unknown,
}
