//! End-to-end orchestration: scan, model, signal, backtest, evaluate.
//!
//! Pair pipelines are independent after the scan, so they run on the rayon
//! pool with private per-pair state; ranking and aggregation only happen
//! after all units complete. A failing pair is recorded and never aborts the
//! batch.

use crate::backtest::{self, BacktestResult};
use crate::config::StrategyConfig;
use crate::error::{PairFailure, StatArbError};
use crate::evaluator::{self, PerformanceMetrics};
use crate::model;
use crate::panel::PricePanel;
use crate::scanner::{self, PairCandidate, ScanCache};
use crate::signal::{self, SignalSeries};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative cancellation token, checked at pair granularity.
///
/// Cancelling mid-run never invalidates work already completed; it only
/// stops new pairs from starting.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Everything produced for one successfully backtested pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairRunResult {
    pub candidate: PairCandidate,
    pub signals: SignalSeries,
    pub backtest: BacktestResult,
    pub metrics: PerformanceMetrics,
}

/// Output of a full scan-to-metrics run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Ranked candidates, including those whose backtests later failed.
    pub candidates: Vec<PairCandidate>,
    pub results: Vec<PairRunResult>,
    /// Untestable pairs from the scan plus execution failures, accumulated.
    pub failures: Vec<PairFailure>,
    pub pairs_tested: usize,
    pub pairs_skipped: usize,
    pub cancelled: bool,
}

/// Run the full pipeline over a panel.
pub fn run(
    panel: &PricePanel,
    config: &StrategyConfig,
    cache: Option<&ScanCache>,
    cancel: &CancelFlag,
) -> Result<RunReport, StatArbError> {
    config
        .validate()
        .map_err(StatArbError::InvalidConfig)?;

    let scan = scanner::scan(panel, config, cache, cancel);
    let candidates = scan.candidates;
    let mut failures = scan.failures;

    info!(
        candidates = candidates.len(),
        "Backtesting candidate pairs"
    );

    let outcomes: Vec<Result<PairRunResult, PairFailure>> = candidates
        .par_iter()
        .filter_map(|candidate| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(run_pair(panel, config, candidate))
        })
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(failure) => {
                warn!(pair = %failure.pair, reason = %failure.kind, "Pair backtest failed");
                failures.push(failure);
            }
        }
    }

    let cancelled = cancel.is_cancelled();
    info!(
        completed = results.len(),
        failed = failures.len(),
        cancelled,
        "Run complete"
    );

    Ok(RunReport {
        candidates,
        results,
        failures,
        pairs_tested: scan.tested,
        pairs_skipped: scan.skipped,
        cancelled,
    })
}

/// Model → signal → backtest → evaluate for one candidate pair.
fn run_pair(
    panel: &PricePanel,
    config: &StrategyConfig,
    candidate: &PairCandidate,
) -> Result<PairRunResult, PairFailure> {
    let pair = &candidate.pair;
    // Symbols came from the panel, so the series are present.
    let prices_a = panel.series(&pair.symbol_a).unwrap_or(&[]);
    let prices_b = panel.series(&pair.symbol_b).unwrap_or(&[]);

    let spread = model::run(
        pair.clone(),
        panel.timestamps(),
        prices_a,
        prices_b,
        candidate.stats.hedge_ratio,
        config,
    );
    let signals = signal::generate(&spread, config);
    let backtest = backtest::run(&spread, &signals, prices_a, prices_b, config)
        .map_err(|kind| PairFailure::new(pair.clone(), kind))?;
    let metrics = evaluator::evaluate(&backtest.equity_curve, &backtest.trades, config);

    Ok(PairRunResult {
        candidate: candidate.clone(),
        signals,
        backtest,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    /// Panel with one strongly cointegrated pair and one unrelated walk.
    fn test_panel(n: usize) -> PricePanel {
        let mut level = 100.0;
        let mut state = 99u64;
        let mut a = Vec::with_capacity(n);
        let mut c = Vec::with_capacity(n);
        let mut other = 40.0;
        for i in 0..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let step = ((state >> 33) as f64) / (u32::MAX as f64) - 0.5;
            level += step;
            a.push(level);
            other += if i % 2 == 0 { 0.9 } else { -0.85 };
            c.push(other);
        }
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| 1.5 * v + ((i * 13) % 7) as f64 * 0.01)
            .collect();
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), a);
        series.insert("BBB".to_string(), b);
        series.insert("CCC".to_string(), c);
        PricePanel::new((0..n as i64).collect(), series).unwrap()
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            lookback_window: 400,
            initial_capital: dec!(50_000),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_run_produces_results_and_report() {
        let panel = test_panel(400);
        let report = run(&panel, &config(), None, &CancelFlag::new()).unwrap();
        assert!(!report.candidates.is_empty());
        assert_eq!(report.results.len(), report.candidates.len());
        for result in &report.results {
            assert_eq!(result.backtest.equity_curve.len(), panel.len());
            assert_eq!(
                result.backtest.equity_curve[0].equity,
                dec!(50_000)
            );
        }
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let panel = test_panel(100);
        let bad = StrategyConfig {
            zscore_entry: -1.0,
            ..Default::default()
        };
        let err = run(&panel, &bad, None, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, StatArbError::InvalidConfig(_)));
    }

    #[test]
    fn test_run_is_deterministic() {
        let panel = test_panel(400);
        let cfg = config();
        let first = run(&panel, &cfg, None, &CancelFlag::new()).unwrap();
        let second = run(&panel, &cfg, None, &CancelFlag::new()).unwrap();
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.results.len(), second.results.len());
        for (x, y) in first.results.iter().zip(second.results.iter()) {
            assert_eq!(x.backtest, y.backtest);
            assert_eq!(x.metrics, y.metrics);
        }
    }

    #[test]
    fn test_cancelled_run_reports_partial_state() {
        let panel = test_panel(400);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = run(&panel, &config(), None, &cancel).unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }
}
