//! Statistical pair discovery.
//!
//! Enumerates every unordered symbol pair in the panel and runs an
//! Engle-Granger cointegration procedure on each: OLS-estimate a static
//! hedge ratio, form the residual spread, test the residuals for
//! stationarity (ADF) and convert the statistic to a p-value. Pairs at or
//! below the configured significance threshold become candidates, ranked by
//! ascending p-value (strongest evidence first).
//!
//! Per-pair tests are independent and side-effect-free over the read-only
//! panel, so they run on a rayon worker pool. Cancellation is cooperative at
//! pair granularity: already-tested pairs stay valid.

pub mod adf;
pub mod cache;

pub use cache::{CachedTest, ScanCache};

use crate::config::StrategyConfig;
use crate::error::{PairFailure, PairFailureKind};
use crate::panel::PricePanel;
use crate::pipeline::CancelFlag;
use crate::types::PairId;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Fallback half-life reported for a non-stationary or invalid spread (bars).
const NON_STATIONARY_HALF_LIFE: f64 = 1e4;

/// Statistics produced by one cointegration test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairStats {
    /// ADF test statistic on the residual spread (more negative = stronger).
    pub test_statistic: f64,
    /// Approximate MacKinnon p-value of the statistic.
    pub p_value: f64,
    /// Static OLS hedge ratio (leg A regressed on leg B).
    pub hedge_ratio: f64,
    /// OLS intercept.
    pub intercept: f64,
    /// Estimated mean-reversion half-life of the residual spread, in bars.
    pub half_life: f64,
    /// Residual spread standard deviation.
    pub spread_std: f64,
}

/// A pair whose residual spread tested cointegrated at the configured
/// significance level. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCandidate {
    pub pair: PairId,
    #[serde(flatten)]
    pub stats: PairStats,
}

/// Result of a full panel scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Candidates sorted by ascending p-value.
    pub candidates: Vec<PairCandidate>,
    /// Pairs that could not be tested (singular regression etc.).
    pub failures: Vec<PairFailure>,
    /// Number of pairs actually tested.
    pub tested: usize,
    /// Pairs skipped for insufficient or degenerate data.
    pub skipped: usize,
    /// True when the scan stopped early on cancellation; partial results
    /// remain valid.
    pub cancelled: bool,
}

/// Scan the panel for cointegrated pairs.
///
/// An optional [`ScanCache`] short-circuits repeated tests of the same pair
/// against the same panel contents.
pub fn scan(
    panel: &PricePanel,
    config: &StrategyConfig,
    cache: Option<&ScanCache>,
    cancel: &CancelFlag,
) -> ScanOutcome {
    let symbols: Vec<&str> = panel.symbols().collect();
    if symbols.len() < 2 {
        debug!(symbols = symbols.len(), "Nothing to scan");
        return ScanOutcome::default();
    }

    let mut pairs = Vec::new();
    for i in 0..symbols.len() {
        for j in (i + 1)..symbols.len() {
            pairs.push((symbols[i], symbols[j]));
        }
    }

    info!(
        symbols = symbols.len(),
        pairs = pairs.len(),
        threshold = config.significance_threshold,
        "Scanning pairs for cointegration"
    );

    let data_version = panel.data_version();
    let outcomes: Vec<PairOutcome> = pairs
        .par_iter()
        .filter_map(|(sym_a, sym_b)| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(evaluate_pair(panel, config, cache, data_version, sym_a, sym_b))
        })
        .collect();

    let cancelled = cancel.is_cancelled();
    let mut outcome = ScanOutcome {
        cancelled,
        ..Default::default()
    };
    for result in outcomes {
        match result {
            PairOutcome::Candidate(candidate) => {
                outcome.tested += 1;
                outcome.candidates.push(candidate);
            }
            PairOutcome::Rejected => outcome.tested += 1,
            PairOutcome::Skipped => outcome.skipped += 1,
            PairOutcome::Untestable(failure) => {
                outcome.tested += 1;
                outcome.failures.push(failure);
            }
        }
    }

    // Ascending p-value; pair id as a deterministic tie-break.
    outcome.candidates.sort_by(|a, b| {
        a.stats
            .p_value
            .partial_cmp(&b.stats.p_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pair.to_string().cmp(&b.pair.to_string()))
    });

    info!(
        candidates = outcome.candidates.len(),
        tested = outcome.tested,
        skipped = outcome.skipped,
        untestable = outcome.failures.len(),
        cancelled = outcome.cancelled,
        "Scan complete"
    );
    outcome
}

enum PairOutcome {
    Candidate(PairCandidate),
    /// Tested fine, p-value above threshold.
    Rejected,
    /// Insufficient or degenerate data; not an error.
    Skipped,
    Untestable(PairFailure),
}

fn evaluate_pair(
    panel: &PricePanel,
    config: &StrategyConfig,
    cache: Option<&ScanCache>,
    data_version: u64,
    sym_a: &str,
    sym_b: &str,
) -> PairOutcome {
    let pair = PairId::new(sym_a, sym_b);

    if let Some(cache) = cache {
        if let Some(hit) = cache.get(sym_a, sym_b, data_version) {
            debug!(pair = %pair, "Scan cache hit");
            return classify(pair, hit, config.significance_threshold);
        }
    }

    let (Some(series_a), Some(series_b)) = (panel.series(sym_a), panel.series(sym_b)) else {
        // Unreachable for symbols enumerated from the panel itself.
        return PairOutcome::Skipped;
    };

    let result = match test_pair(series_a, series_b, config) {
        TestResult::Stats(stats) => CachedTest::Tested(stats),
        TestResult::Skipped => return PairOutcome::Skipped,
        TestResult::Untestable(reason) => CachedTest::Untestable(reason),
    };

    if let Some(cache) = cache {
        cache.insert(sym_a, sym_b, data_version, result.clone());
    }
    classify(pair, result, config.significance_threshold)
}

fn classify(pair: PairId, test: CachedTest, threshold: f64) -> PairOutcome {
    match test {
        CachedTest::Tested(stats) => {
            if stats.p_value <= threshold {
                debug!(
                    pair = %pair,
                    p_value = format!("{:.4}", stats.p_value),
                    statistic = format!("{:.2}", stats.test_statistic),
                    hedge_ratio = format!("{:.4}", stats.hedge_ratio),
                    "Cointegrated pair found"
                );
                PairOutcome::Candidate(PairCandidate { pair, stats })
            } else {
                debug!(
                    pair = %pair,
                    p_value = format!("{:.4}", stats.p_value),
                    "Above significance threshold"
                );
                PairOutcome::Rejected
            }
        }
        CachedTest::Untestable(reason) => {
            warn!(pair = %pair, reason = %reason, "Pair untestable");
            PairOutcome::Untestable(PairFailure::new(
                pair,
                PairFailureKind::Untestable { reason },
            ))
        }
    }
}

enum TestResult {
    Stats(PairStats),
    Skipped,
    Untestable(String),
}

/// Run the Engle-Granger procedure on one pair of aligned price series.
fn test_pair(series_a: &[f64], series_b: &[f64], config: &StrategyConfig) -> TestResult {
    // Trailing lookback window, then drop rows where either leg is missing.
    let start = series_a.len().saturating_sub(config.lookback_window);
    let mut ys = Vec::with_capacity(series_a.len() - start);
    let mut xs = Vec::with_capacity(series_a.len() - start);
    for i in start..series_a.len() {
        if series_a[i].is_finite() && series_b[i].is_finite() {
            ys.push(series_a[i]);
            xs.push(series_b[i]);
        }
    }

    if ys.len() < config.min_sample_size {
        return TestResult::Skipped;
    }
    if is_constant(&ys) || is_constant(&xs) {
        return TestResult::Skipped;
    }

    let Some(fit) = ols_fit(&ys, &xs) else {
        return TestResult::Untestable("singular OLS regression".to_string());
    };

    let residuals: Vec<f64> = ys
        .iter()
        .zip(xs.iter())
        .map(|(y, x)| y - (fit.intercept + fit.beta * x))
        .collect();

    let Some(statistic) = adf::adf_statistic(&residuals) else {
        return TestResult::Untestable("degenerate residual series".to_string());
    };
    let p_value = adf::mackinnon_pvalue(statistic);
    let (spread_std, half_life) = analyze_residuals(&residuals);

    TestResult::Stats(PairStats {
        test_statistic: statistic,
        p_value,
        hedge_ratio: fit.beta,
        intercept: fit.intercept,
        half_life,
        spread_std,
    })
}

fn is_constant(series: &[f64]) -> bool {
    series
        .windows(2)
        .all(|w| (w[1] - w[0]).abs() < f64::EPSILON)
}

struct OlsFit {
    intercept: f64,
    beta: f64,
}

/// OLS of y on x with intercept. `None` when x has no variance or the
/// coefficients come out non-finite.
fn ols_fit(ys: &[f64], xs: &[f64]) -> Option<OlsFit> {
    let n = ys.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    for (y, x) in ys.iter().zip(xs.iter()) {
        let dx = x - mean_x;
        covariance += dx * (y - mean_y);
        variance_x += dx * dx;
    }

    if variance_x.abs() < f64::EPSILON {
        return None;
    }
    let beta = covariance / variance_x;
    let intercept = mean_y - beta * mean_x;
    (beta.is_finite() && intercept.is_finite()).then_some(OlsFit { intercept, beta })
}

/// Residual spread stddev and O-U half-life from lag-1 autocorrelation:
/// half_life = -ln(2) / ln(ρ).
fn analyze_residuals(residuals: &[f64]) -> (f64, f64) {
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..residuals.len() - 1 {
        let dx = residuals[i] - mean;
        let dy = residuals[i + 1] - mean;
        numerator += dx * dy;
        denominator += dx * dx;
    }
    let rho = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };

    let half_life = if rho > 0.0 && rho < 1.0 {
        -2.0f64.ln() / rho.ln()
    } else {
        NON_STATIONARY_HALF_LIFE
    };

    (std_dev, half_life)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_panel(series: &[(&str, Vec<f64>)]) -> PricePanel {
        let len = series[0].1.len();
        let timestamps: Vec<i64> = (0..len as i64).collect();
        let map: BTreeMap<String, Vec<f64>> = series
            .iter()
            .map(|(s, v)| (s.to_string(), v.clone()))
            .collect();
        PricePanel::new(timestamps, map).unwrap()
    }

    /// Two series sharing a random-walk component with tiny idiosyncratic
    /// noise: B = 2*A + noise.
    fn cointegrated_panel(n: usize) -> PricePanel {
        let mut a = Vec::with_capacity(n);
        let mut level = 100.0;
        let mut state = 12345u64;
        for _ in 0..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let step = ((state >> 33) as f64) / (u32::MAX as f64) - 0.5;
            level += step;
            a.push(level);
        }
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 * v + ((i * 17) % 11) as f64 * 1e-6)
            .collect();
        make_panel(&[("AAA", a), ("BBB", b)])
    }

    #[test]
    fn test_perfectly_dependent_pair_is_found() {
        let panel = cointegrated_panel(300);
        let config = StrategyConfig {
            significance_threshold: 0.01,
            ..Default::default()
        };
        let outcome = scan(&panel, &config, None, &CancelFlag::new());
        assert_eq!(outcome.candidates.len(), 1, "pair should be cointegrated");
        let candidate = &outcome.candidates[0];
        assert!(candidate.stats.p_value < 0.01);
        assert!((candidate.stats.hedge_ratio - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_empty_panel_returns_empty() {
        let panel = PricePanel::new(vec![], BTreeMap::new()).unwrap();
        let outcome = scan(&panel, &StrategyConfig::default(), None, &CancelFlag::new());
        assert!(outcome.candidates.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_insufficient_history_is_skipped() {
        let panel = make_panel(&[
            ("A", vec![1.0, 2.0, 3.0]),
            ("B", vec![2.0, 4.0, 6.0]),
        ]);
        let outcome = scan(&panel, &StrategyConfig::default(), None, &CancelFlag::new());
        assert!(outcome.candidates.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_constant_series_is_skipped() {
        let varying: Vec<f64> = (0..100).map(|i| 100.0 + (i % 7) as f64).collect();
        let constant = vec![50.0; 100];
        let panel = make_panel(&[("CONST", constant), ("VAR", varying)]);
        let outcome = scan(&panel, &StrategyConfig::default(), None, &CancelFlag::new());
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let stats = PairStats {
            test_statistic: -3.34,
            p_value: 0.05,
            hedge_ratio: 1.0,
            intercept: 0.0,
            half_life: 5.0,
            spread_std: 1.0,
        };
        let at = classify(PairId::new("A", "B"), CachedTest::Tested(stats), 0.05);
        assert!(matches!(at, PairOutcome::Candidate(_)));

        let above = PairStats {
            p_value: 0.050001,
            ..stats
        };
        let over = classify(PairId::new("A", "B"), CachedTest::Tested(above), 0.05);
        assert!(matches!(over, PairOutcome::Rejected));
    }

    #[test]
    fn test_cache_is_used_on_second_scan() {
        let panel = cointegrated_panel(300);
        let config = StrategyConfig::default();
        let cache = ScanCache::new();
        let first = scan(&panel, &config, Some(&cache), &CancelFlag::new());
        assert_eq!(cache.len(), 1);
        let second = scan(&panel, &config, Some(&cache), &CancelFlag::new());
        assert_eq!(first.candidates, second.candidates);
    }

    #[test]
    fn test_cancelled_scan_is_partial_and_flagged() {
        let panel = cointegrated_panel(300);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = scan(&panel, &StrategyConfig::default(), None, &cancel);
        assert!(outcome.cancelled);
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn test_ols_recovers_known_slope() {
        let xs: Vec<f64> = (1..=50).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 + 0.5 * x).collect();
        let fit = ols_fit(&ys, &xs).unwrap();
        assert!((fit.beta - 0.5).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_life_of_fast_reversion_is_short() {
        let mut residuals = Vec::with_capacity(200);
        let mut current = 5.0;
        for i in 0..200 {
            let noise = ((i * 31) % 13) as f64 / 13.0 - 0.5;
            current = 0.5 * current + noise;
            residuals.push(current);
        }
        let (_, half_life) = analyze_residuals(&residuals);
        assert!(half_life < 5.0, "got half-life {}", half_life);
    }
}
