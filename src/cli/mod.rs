//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for the research pipeline, including
//! all subcommands and their arguments.

mod config;

pub use config::{CliConfigError, DataSourceConfig};

use clap::{Parser, Subcommand};

/// StatArb - pairs-trading research and evaluation pipeline
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan a price panel for cointegrated pairs
    Scan {
        /// Path to a long-format CSV (columns: symbol, timestamp, price)
        #[arg(long)]
        data: Option<String>,
        /// Symbols for synthetic data (comma-separated, or "default")
        #[arg(long, default_value = "default")]
        symbols: String,
        /// Number of synthetic bars to generate
        #[arg(long, default_value_t = 500)]
        bars: usize,
        /// Generate synthetic data instead of reading a CSV
        #[arg(long, default_value_t = false)]
        synthetic: bool,
        /// Path to a strategy configuration JSON file
        #[arg(long)]
        config: Option<String>,
        /// Output directory for results
        #[arg(long, default_value = "statarb_results")]
        output_dir: String,
    },

    /// Run the full scan-model-signal-backtest-evaluate pipeline
    Run {
        /// Path to a long-format CSV (columns: symbol, timestamp, price)
        #[arg(long)]
        data: Option<String>,
        /// Symbols for synthetic data (comma-separated, or "default")
        #[arg(long, default_value = "default")]
        symbols: String,
        /// Number of synthetic bars to generate
        #[arg(long, default_value_t = 500)]
        bars: usize,
        /// Generate synthetic data instead of reading a CSV
        #[arg(long, default_value_t = false)]
        synthetic: bool,
        /// Path to a strategy configuration JSON file
        #[arg(long)]
        config: Option<String>,
        /// Output directory for results
        #[arg(long, default_value = "statarb_results")]
        output_dir: String,
    },
}
