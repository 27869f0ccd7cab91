//! Scan command handler.
//!
//! Implements the `scan` subcommand: load a panel, run the cointegration
//! scan, print the ranked candidates and write them as JSON.

use super::data;
use crate::cli::DataSourceConfig;
use crate::pipeline::CancelFlag;
use crate::report;
use crate::scanner;
use tracing::info;

/// Run a standalone pair scan with the provided CLI configuration.
///
/// # Errors
/// Returns an error if data loading, config validation, or writing the
/// output fails.
pub fn run_scan(config: DataSourceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = config.load_strategy_config()?;
    strategy
        .validate()
        .map_err(crate::error::StatArbError::InvalidConfig)?;
    let panel = data::load_panel(&config)?;

    let outcome = scanner::scan(&panel, &strategy, None, &CancelFlag::new());

    info!("--- Scan Results ---");
    for (rank, candidate) in outcome.candidates.iter().enumerate() {
        info!(
            rank = rank + 1,
            pair = %candidate.pair,
            p_value = format!("{:.4}", candidate.stats.p_value),
            statistic = format!("{:.2}", candidate.stats.test_statistic),
            hedge_ratio = format!("{:.4}", candidate.stats.hedge_ratio),
            half_life = format!("{:.1}", candidate.stats.half_life),
            "Candidate"
        );
    }
    info!(
        candidates = outcome.candidates.len(),
        tested = outcome.tested,
        skipped = outcome.skipped,
        untestable = outcome.failures.len(),
        "--------------------"
    );

    report::write_scan_report(&outcome, &config.output_dir)?;
    Ok(())
}
