//! Recursive spread/hedge-ratio estimation.
//!
//! One `SpreadModel` instance per pair; state evolves strictly forward in
//! time and each state depends only on the previous state and the newest
//! observation.

pub mod kalman;

pub use kalman::{KalmanStep, SpreadKalman};

use crate::config::StrategyConfig;
use crate::types::PairId;
use serde::Serialize;
use tracing::debug;

/// Filter posterior for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadState {
    pub timestamp: i64,
    pub hedge_ratio: f64,
    /// Innovation spread; `NaN` when the observation was missing.
    pub spread: f64,
    pub covariance: f64,
    pub degenerate: bool,
}

/// Full spread/hedge-ratio series for one pair.
#[derive(Debug, Clone, Serialize)]
pub struct SpreadSeries {
    pub pair: PairId,
    pub states: Vec<SpreadState>,
    /// Steps where the Kalman update was skipped (recorded, not fatal).
    pub degenerate_steps: u32,
}

/// Run the Kalman recursion over an aligned pair of price series.
///
/// `initial_hedge_ratio` normally comes from the scanner's static OLS
/// estimate; callers without one pass 1.0.
pub fn run(
    pair: PairId,
    timestamps: &[i64],
    prices_a: &[f64],
    prices_b: &[f64],
    initial_hedge_ratio: f64,
    config: &StrategyConfig,
) -> SpreadSeries {
    debug_assert_eq!(timestamps.len(), prices_a.len());
    debug_assert_eq!(timestamps.len(), prices_b.len());

    let mut filter = SpreadKalman::new(
        initial_hedge_ratio,
        config.kalman_initial_covariance,
        config.kalman_process_noise,
        config.kalman_observation_noise,
    );

    let mut states = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        let step = filter.step(prices_b[i], prices_a[i]);
        states.push(SpreadState {
            timestamp: timestamps[i],
            hedge_ratio: step.hedge_ratio,
            spread: step.spread,
            covariance: step.covariance,
            degenerate: step.degenerate,
        });
    }

    let degenerate_steps = filter.degenerate_steps();
    if degenerate_steps > 0 {
        debug!(
            pair = %pair,
            degenerate_steps,
            "Spread model skipped degenerate updates"
        );
    }

    SpreadSeries {
        pair,
        states,
        degenerate_steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> (Vec<i64>, Vec<f64>, Vec<f64>) {
        let timestamps: Vec<i64> = (0..n as i64).collect();
        let prices_b: Vec<f64> = (0..n).map(|i| 100.0 + (i % 13) as f64).collect();
        let prices_a: Vec<f64> = prices_b.iter().map(|p| 1.5 * p).collect();
        (timestamps, prices_a, prices_b)
    }

    #[test]
    fn test_one_state_per_timestamp() {
        let (ts, a, b) = series(50);
        let out = run(PairId::new("A", "B"), &ts, &a, &b, 1.0, &StrategyConfig::default());
        assert_eq!(out.states.len(), 50);
        assert_eq!(out.states[0].timestamp, 0);
        assert_eq!(out.states[49].timestamp, 49);
    }

    #[test]
    fn test_deterministic_replay() {
        let (ts, a, b) = series(200);
        let config = StrategyConfig::default();
        let pair = PairId::new("A", "B");
        let first = run(pair.clone(), &ts, &a, &b, 1.2, &config);
        let second = run(pair, &ts, &a, &b, 1.2, &config);
        assert_eq!(first.states, second.states);
    }

    #[test]
    fn test_missing_observation_marks_degenerate() {
        let (ts, mut a, b) = series(40);
        a[10] = f64::NAN;
        let out = run(PairId::new("A", "B"), &ts, &a, &b, 1.0, &StrategyConfig::default());
        assert!(out.states[10].degenerate);
        assert!(out.states[10].spread.is_nan());
        assert_eq!(out.degenerate_steps, 1);
        // State carried forward from the previous step.
        assert_eq!(out.states[10].hedge_ratio, out.states[9].hedge_ratio);
    }

    #[test]
    fn test_converges_on_proportional_pair() {
        let (ts, a, b) = series(500);
        let out = run(PairId::new("A", "B"), &ts, &a, &b, 1.0, &StrategyConfig::default());
        let last = out.states.last().unwrap();
        assert!((last.hedge_ratio - 1.5).abs() < 0.05, "got {}", last.hedge_ratio);
    }
}
