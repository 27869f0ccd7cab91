//! Error types for the research pipeline.
//!
//! Fatal errors (`StatArbError`) abort a run immediately; per-pair failures
//! (`PairFailure`) are accumulated into the run report so a single bad pair
//! never takes down the batch.

use crate::types::PairId;
use serde::Serialize;
use thiserror::Error;

/// Fatal errors that block a run.
#[derive(Error, Debug)]
pub enum StatArbError {
    /// Malformed or misaligned price panel.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// DataFrame error at the ingestion boundary
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single pair dropped out of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PairFailureKind {
    /// Cointegration test could not produce a finite statistic
    /// (singular regression, degenerate series).
    Untestable { reason: String },
    /// A fill was required at a timestamp with no usable price;
    /// the pair's backtest was aborted.
    ExecutionDataGap { timestamp: i64 },
}

impl std::fmt::Display for PairFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairFailureKind::Untestable { reason } => write!(f, "untestable: {}", reason),
            PairFailureKind::ExecutionDataGap { timestamp } => {
                write!(f, "missing price at fill time {}", timestamp)
            }
        }
    }
}

/// A recorded, non-fatal per-pair failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
    pub pair: PairId,
    pub kind: PairFailureKind,
}

impl PairFailure {
    pub fn new(pair: PairId, kind: PairFailureKind) -> Self {
        Self { pair, kind }
    }
}
