//! Run command handler.
//!
//! Implements the `run` subcommand: the full scan-to-metrics pipeline over
//! a panel, with a per-pair metrics summary and a JSON report.

use super::data;
use crate::cli::DataSourceConfig;
use crate::pipeline::{self, CancelFlag};
use crate::report;
use tracing::info;

/// Run the full pipeline with the provided CLI configuration.
///
/// # Errors
/// Returns an error if data loading, config validation, the run itself, or
/// writing the output fails.
pub fn run_pipeline(config: DataSourceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = config.load_strategy_config()?;
    let panel = data::load_panel(&config)?;

    let run = pipeline::run(&panel, &strategy, None, &CancelFlag::new())?;

    info!("--- Pipeline Results ---");
    for result in &run.results {
        let m = &result.metrics;
        info!(
            pair = %result.candidate.pair,
            p_value = format!("{:.4}", result.candidate.stats.p_value),
            sharpe = format!("{:.2}", m.sharpe_ratio),
            max_drawdown_pct = format!("{:.2}", m.max_drawdown * 100.0),
            return_pct = format!("{:.2}", m.total_return * 100.0),
            win_rate_pct = format!("{:.1}", m.win_rate * 100.0),
            trades = m.trade_count,
            open = m.open_trades,
            avg_holding = format!("{:.1}", m.avg_holding_period),
            final_equity = %m.final_equity,
            "Pair evaluated"
        );
    }
    for failure in &run.failures {
        info!(pair = %failure.pair, reason = %failure.kind, "Pair failed");
    }
    info!(
        completed = run.results.len(),
        failed = run.failures.len(),
        "------------------------"
    );

    report::write_run_report(&run, &config.output_dir)?;
    Ok(())
}
