//! CLI configuration structs bridging CLI arguments to domain types.
//!
//! These structs decouple the CLI parsing layer from the pipeline core,
//! allowing command handlers to work with validated, typed configurations.

use crate::config::StrategyConfig;
use std::path::PathBuf;
use thiserror::Error;

/// Symbols used when the user asks for the built-in synthetic universe.
const DEFAULT_SYMBOLS: [&str; 6] = [
    "BTC-USD", "ETH-USD", "SOL-USD", "AVAX-USD", "LTC-USD", "DOGE-USD",
];

/// Errors that can occur when resolving CLI configuration.
#[derive(Debug, Error)]
pub enum CliConfigError {
    #[error("At least one symbol is required")]
    EmptySymbols,

    #[error("No data source: pass --data <csv> or --synthetic")]
    NoDataSource,

    #[error("Synthetic generation needs at least 2 bars, got {0}")]
    TooFewBars(usize),

    #[error("Failed to read config file '{0}': {1}")]
    ConfigRead(PathBuf, std::io::Error),

    #[error("Failed to parse config file '{0}': {1}")]
    ConfigParse(PathBuf, serde_json::Error),
}

/// Resolved data-source and configuration arguments shared by the
/// `scan` and `run` subcommands.
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// CSV path; `None` means synthetic data.
    pub data: Option<PathBuf>,
    /// Symbols for synthetic generation.
    pub symbols: Vec<String>,
    /// Synthetic series length.
    pub bars: usize,
    /// Strategy config file, if any.
    pub config_path: Option<PathBuf>,
    /// Directory that receives JSON artifacts.
    pub output_dir: PathBuf,
}

impl DataSourceConfig {
    /// Resolve raw CLI strings into a validated configuration.
    pub fn resolve(
        data: Option<String>,
        symbols: &str,
        bars: usize,
        synthetic: bool,
        config: Option<String>,
        output_dir: String,
    ) -> Result<Self, CliConfigError> {
        let data = match (data, synthetic) {
            (Some(path), _) => Some(PathBuf::from(path)),
            (None, true) => None,
            (None, false) => return Err(CliConfigError::NoDataSource),
        };

        let symbols = parse_symbols(symbols)?;
        if data.is_none() && bars < 2 {
            return Err(CliConfigError::TooFewBars(bars));
        }

        Ok(Self {
            data,
            symbols,
            bars,
            config_path: config.map(PathBuf::from),
            output_dir: PathBuf::from(output_dir),
        })
    }

    /// Load the strategy configuration, falling back to defaults when no
    /// file was given. Unset fields in the file take their defaults too.
    pub fn load_strategy_config(&self) -> Result<StrategyConfig, CliConfigError> {
        match &self.config_path {
            None => Ok(StrategyConfig::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| CliConfigError::ConfigRead(path.clone(), e))?;
                serde_json::from_str(&raw)
                    .map_err(|e| CliConfigError::ConfigParse(path.clone(), e))
            }
        }
    }
}

fn parse_symbols(raw: &str) -> Result<Vec<String>, CliConfigError> {
    if raw.trim().eq_ignore_ascii_case("default") {
        return Ok(DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());
    }
    let symbols: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        return Err(CliConfigError::EmptySymbols);
    }
    Ok(symbols)
}
