//! Signal generation from a tracked spread series.
//!
//! Maintains rolling spread statistics, gates on volatility and regime, and
//! drives a {Flat, LongSpread, ShortSpread} state machine from z-score
//! thresholds.
//!
//! Reversal policy: a triggered reversal closes the position and holds Flat
//! for at least one period; the opposite entry may fire at the next
//! evaluation step at the earliest. There is no same-step flip, so the
//! sequence never contains LongSpread and ShortSpread on adjacent steps.

use crate::config::{RegimePolicy, StrategyConfig};
use crate::model::SpreadSeries;
use crate::types::{PairId, PositionState, Regime};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// One evaluated step of the signal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    pub timestamp: i64,
    /// Position state after this step's transition.
    pub state: PositionState,
    pub regime: Regime,
    pub z_score: f64,
    /// Rolling spread standard deviation at this step.
    pub volatility: f64,
    /// Entry-quantity multiplier (1.0 under the gate policy; the configured
    /// regime weight outside the mean-reverting regime under soft weighting).
    pub weight: f64,
}

/// Ordered signal sequence for one pair.
#[derive(Debug, Clone, Serialize)]
pub struct SignalSeries {
    pub pair: PairId,
    pub points: Vec<Signal>,
}

/// Per-pair signal state machine over rolling spread statistics.
pub struct SignalGenerator<'a> {
    config: &'a StrategyConfig,
    window: VecDeque<f64>,
    state: PositionState,
    /// Bars the current position has been held.
    holding: usize,
}

impl<'a> SignalGenerator<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        Self {
            config,
            window: VecDeque::with_capacity(config.zscore_window),
            state: PositionState::Flat,
            holding: 0,
        }
    }

    /// Evaluate one spread observation and return the resulting signal.
    pub fn step(&mut self, timestamp: i64, spread: f64) -> Signal {
        if !spread.is_finite() {
            // Missing observation: treat as a filter failure; any open
            // position is closed, nothing enters.
            if self.state != PositionState::Flat {
                self.state = PositionState::Flat;
                self.holding = 0;
            }
            return Signal {
                timestamp,
                state: self.state,
                regime: Regime::Unknown,
                z_score: 0.0,
                volatility: 0.0,
                weight: 0.0,
            };
        }

        self.window.push_back(spread);
        if self.window.len() > self.config.zscore_window {
            self.window.pop_front();
        }

        if self.window.len() < self.config.zscore_window {
            // Warmup: stay flat until the rolling statistics are defined.
            return Signal {
                timestamp,
                state: PositionState::Flat,
                regime: Regime::Unknown,
                z_score: 0.0,
                volatility: 0.0,
                weight: 0.0,
            };
        }

        let (mean, std_dev) = rolling_stats(&self.window);
        let z_score = if std_dev == 0.0 {
            0.0
        } else {
            (spread - mean) / std_dev
        };

        let volatility_ok = std_dev >= self.config.volatility_band_min
            && std_dev <= self.config.volatility_band_max;

        let rho = lag1_autocorrelation(&self.window, mean);
        let regime = if rho < self.config.regime_autocorr_threshold {
            Regime::MeanReverting
        } else {
            Regime::Trending
        };

        // The regime classifier is a hard gate by default; under soft
        // weighting it only scales entry size.
        let regime_blocks_entry =
            self.config.regime_policy == RegimePolicy::Gate && regime != Regime::MeanReverting;
        let regime_forces_exit = regime_blocks_entry;

        let weight = match self.config.regime_policy {
            RegimePolicy::Gate => 1.0,
            RegimePolicy::Weight => {
                if regime == Regime::MeanReverting {
                    1.0
                } else {
                    self.config.regime_weight
                }
            }
        };

        let entry_eligible = volatility_ok && !regime_blocks_entry;

        match self.state {
            PositionState::Flat => {
                if entry_eligible && z_score <= -self.config.zscore_entry {
                    self.state = PositionState::LongSpread;
                    self.holding = 0;
                } else if entry_eligible && z_score >= self.config.zscore_entry {
                    self.state = PositionState::ShortSpread;
                    self.holding = 0;
                }
            }
            PositionState::LongSpread => {
                self.holding += 1;
                let reverted = z_score >= -self.config.zscore_exit;
                let expired = self.holding >= self.config.max_holding_period;
                if reverted || !volatility_ok || regime_forces_exit || expired {
                    self.state = PositionState::Flat;
                    self.holding = 0;
                }
            }
            PositionState::ShortSpread => {
                self.holding += 1;
                let reverted = z_score <= self.config.zscore_exit;
                let expired = self.holding >= self.config.max_holding_period;
                if reverted || !volatility_ok || regime_forces_exit || expired {
                    self.state = PositionState::Flat;
                    self.holding = 0;
                }
            }
        }

        Signal {
            timestamp,
            state: self.state,
            regime,
            z_score,
            volatility: std_dev,
            weight,
        }
    }
}

/// Generate the full signal sequence for a pair's spread series.
pub fn generate(spread_series: &SpreadSeries, config: &StrategyConfig) -> SignalSeries {
    let mut generator = SignalGenerator::new(config);
    let points: Vec<Signal> = spread_series
        .states
        .iter()
        .map(|state| generator.step(state.timestamp, state.spread))
        .collect();

    let entries = points
        .windows(2)
        .filter(|w| w[0].state == PositionState::Flat && w[1].state != PositionState::Flat)
        .count();
    debug!(pair = %spread_series.pair, points = points.len(), entries, "Signals generated");

    SignalSeries {
        pair: spread_series.pair.clone(),
        points,
    }
}

fn rolling_stats(window: &VecDeque<f64>) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|value| {
            let diff = mean - value;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

fn lag1_autocorrelation(window: &VecDeque<f64>, mean: f64) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut prev: Option<f64> = None;
    for &value in window {
        let centered = value - mean;
        if let Some(p) = prev {
            numerator += p * centered;
        }
        denominator += centered * centered;
        prev = Some(centered);
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
