//! Configuration for the research-and-evaluation pipeline.
//!
//! Everything is an explicit struct handed into the core; there is no
//! ambient configuration state.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How the regime classifier affects signal emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimePolicy {
    /// Suppress entries entirely outside the mean-reverting regime.
    Gate,
    /// Allow entries in any regime, but scale entry quantity by
    /// `regime_weight` when the spread is classified as trending.
    Weight,
}

/// Position sizing rule applied at entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PositionSizing {
    /// Leg A notional = equity * fraction.
    FixedFraction { fraction: f64 },
    /// Leg A quantity is a fixed unit count.
    FixedUnit { units: Decimal },
    /// Leg A quantity = equity * risk_fraction / rolling spread volatility.
    InverseVolatility { risk_fraction: f64 },
}

/// How the second leg is sized relative to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neutrality {
    /// qty_B = hedge_ratio * qty_A (ratio-neutral).
    Ratio,
    /// qty_B * price_B = qty_A * price_A (dollar-neutral).
    Dollar,
}

/// Full configuration for a scan-to-metrics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    // --- PairScanner ---
    /// Number of trailing observations used by the cointegration test.
    #[serde(default = "default_lookback_window")]
    pub lookback_window: usize,
    /// Maximum p-value for a pair to become a candidate.
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,
    /// Minimum overlapping observations required to test a pair.
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: usize,

    // --- SpreadModel ---
    /// Kalman process noise Q (hedge-ratio drift speed).
    #[serde(default = "default_process_noise")]
    pub kalman_process_noise: f64,
    /// Kalman observation noise R (measurement uncertainty).
    #[serde(default = "default_observation_noise")]
    pub kalman_observation_noise: f64,
    /// Prior covariance the filter starts from.
    #[serde(default = "default_initial_covariance")]
    pub kalman_initial_covariance: f64,

    // --- SignalGenerator ---
    /// Z-score magnitude to enter a position.
    #[serde(default = "default_zscore_entry")]
    pub zscore_entry: f64,
    /// Z-score magnitude at which a position has reverted enough to exit.
    #[serde(default = "default_zscore_exit")]
    pub zscore_exit: f64,
    /// Rolling window for the spread mean/stddev.
    #[serde(default = "default_zscore_window")]
    pub zscore_window: usize,
    /// Rolling stddev below which the spread is uninformative.
    #[serde(default = "default_volatility_band_min")]
    pub volatility_band_min: f64,
    /// Rolling stddev above which the relationship is likely broken.
    #[serde(default = "default_volatility_band_max")]
    pub volatility_band_max: f64,
    /// Maximum bars a position may be held before a forced exit.
    #[serde(default = "default_max_holding_period")]
    pub max_holding_period: usize,
    /// Hard gate vs. soft weighting for the regime classifier.
    #[serde(default = "default_regime_policy")]
    pub regime_policy: RegimePolicy,
    /// Lag-1 autocorrelation below which the spread counts as mean-reverting.
    #[serde(default = "default_regime_autocorr_threshold")]
    pub regime_autocorr_threshold: f64,
    /// Entry-quantity multiplier outside the mean-reverting regime
    /// (only used with `RegimePolicy::Weight`).
    #[serde(default = "default_regime_weight")]
    pub regime_weight: f64,

    // --- BacktestEngine ---
    /// Slippage per fill, in basis points of the reference price.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
    /// Proportional fee per fill, in basis points of traded notional.
    #[serde(default = "default_fee_bps")]
    pub fee_bps: Decimal,
    /// Fixed fee per trade (applied once at entry and once at exit).
    #[serde(default = "default_fee_fixed")]
    pub fee_fixed: Decimal,
    /// Position sizing rule.
    #[serde(default = "default_position_sizing")]
    pub position_sizing_rule: PositionSizing,
    /// Leg-B sizing convention.
    #[serde(default = "default_neutrality")]
    pub neutrality: Neutrality,
    /// Starting capital per pair backtest.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    // --- Evaluator ---
    /// Periods per year for Sharpe annualization (e.g. 252 daily bars).
    #[serde(default = "default_annualization_factor")]
    pub annualization_factor: f64,
    /// Annual risk-free rate used for excess returns.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

// Default value functions for serde
fn default_lookback_window() -> usize {
    250
}
fn default_significance_threshold() -> f64 {
    0.05
}
fn default_min_sample_size() -> usize {
    30
}
fn default_process_noise() -> f64 {
    1e-5
}
fn default_observation_noise() -> f64 {
    1e-3
}
fn default_initial_covariance() -> f64 {
    1.0
}
fn default_zscore_entry() -> f64 {
    2.0
}
fn default_zscore_exit() -> f64 {
    0.5
}
fn default_zscore_window() -> usize {
    30
}
fn default_volatility_band_min() -> f64 {
    1e-6
}
fn default_volatility_band_max() -> f64 {
    1e3
}
fn default_max_holding_period() -> usize {
    100
}
fn default_regime_policy() -> RegimePolicy {
    RegimePolicy::Gate
}
fn default_regime_autocorr_threshold() -> f64 {
    0.8
}
fn default_regime_weight() -> f64 {
    0.5
}
fn default_slippage_bps() -> Decimal {
    dec!(5)
}
fn default_fee_bps() -> Decimal {
    dec!(10)
}
fn default_fee_fixed() -> Decimal {
    Decimal::ZERO
}
fn default_position_sizing() -> PositionSizing {
    PositionSizing::FixedFraction { fraction: 0.1 }
}
fn default_neutrality() -> Neutrality {
    Neutrality::Ratio
}
fn default_initial_capital() -> Decimal {
    dec!(100_000)
}
fn default_annualization_factor() -> f64 {
    252.0
}
fn default_risk_free_rate() -> f64 {
    0.0
}

impl Default for StrategyConfig {
    fn default() -> Self {
        // serde_json round-trip would also work; spelling it out keeps the
        // struct literal exhaustive when fields are added.
        Self {
            lookback_window: default_lookback_window(),
            significance_threshold: default_significance_threshold(),
            min_sample_size: default_min_sample_size(),
            kalman_process_noise: default_process_noise(),
            kalman_observation_noise: default_observation_noise(),
            kalman_initial_covariance: default_initial_covariance(),
            zscore_entry: default_zscore_entry(),
            zscore_exit: default_zscore_exit(),
            zscore_window: default_zscore_window(),
            volatility_band_min: default_volatility_band_min(),
            volatility_band_max: default_volatility_band_max(),
            max_holding_period: default_max_holding_period(),
            regime_policy: default_regime_policy(),
            regime_autocorr_threshold: default_regime_autocorr_threshold(),
            regime_weight: default_regime_weight(),
            slippage_bps: default_slippage_bps(),
            fee_bps: default_fee_bps(),
            fee_fixed: default_fee_fixed(),
            position_sizing_rule: default_position_sizing(),
            neutrality: default_neutrality(),
            initial_capital: default_initial_capital(),
            annualization_factor: default_annualization_factor(),
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

impl StrategyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.significance_threshold) {
            return Err(format!(
                "significance_threshold must be between 0.0 and 1.0, got {}",
                self.significance_threshold
            ));
        }
        if self.min_sample_size < 20 {
            return Err(format!(
                "min_sample_size must be at least 20 for a meaningful test, got {}",
                self.min_sample_size
            ));
        }
        if self.lookback_window < self.min_sample_size {
            return Err(format!(
                "lookback_window ({}) must be >= min_sample_size ({})",
                self.lookback_window, self.min_sample_size
            ));
        }
        if self.kalman_process_noise <= 0.0 || self.kalman_observation_noise <= 0.0 {
            return Err("kalman noise parameters must be positive".to_string());
        }
        if self.kalman_initial_covariance <= 0.0 {
            return Err("kalman_initial_covariance must be positive".to_string());
        }
        if self.zscore_entry <= 0.0 {
            return Err(format!(
                "zscore_entry must be positive, got {}",
                self.zscore_entry
            ));
        }
        if self.zscore_exit < 0.0 || self.zscore_exit >= self.zscore_entry {
            return Err(format!(
                "zscore_exit must be in [0, zscore_entry), got {}",
                self.zscore_exit
            ));
        }
        if self.zscore_window < 2 {
            return Err("zscore_window must be at least 2".to_string());
        }
        if self.volatility_band_min <= 0.0 || self.volatility_band_max <= self.volatility_band_min
        {
            return Err(format!(
                "volatility band must satisfy 0 < min < max, got [{}, {}]",
                self.volatility_band_min, self.volatility_band_max
            ));
        }
        if self.max_holding_period == 0 {
            return Err("max_holding_period must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.regime_weight) {
            return Err(format!(
                "regime_weight must be between 0.0 and 1.0, got {}",
                self.regime_weight
            ));
        }
        if self.slippage_bps < Decimal::ZERO || self.fee_bps < Decimal::ZERO {
            return Err("slippage_bps and fee_bps cannot be negative".to_string());
        }
        if self.fee_fixed < Decimal::ZERO {
            return Err("fee_fixed cannot be negative".to_string());
        }
        match self.position_sizing_rule {
            PositionSizing::FixedFraction { fraction } => {
                if !(fraction > 0.0 && fraction <= 1.0) {
                    return Err(format!(
                        "fixed_fraction sizing fraction must be in (0, 1], got {}",
                        fraction
                    ));
                }
            }
            PositionSizing::FixedUnit { units } => {
                if units <= Decimal::ZERO {
                    return Err("fixed_unit sizing units must be positive".to_string());
                }
            }
            PositionSizing::InverseVolatility { risk_fraction } => {
                if !(risk_fraction > 0.0 && risk_fraction <= 1.0) {
                    return Err(format!(
                        "inverse_volatility risk_fraction must be in (0, 1], got {}",
                        risk_fraction
                    ));
                }
            }
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err("initial_capital must be positive".to_string());
        }
        if self.annualization_factor <= 0.0 {
            return Err("annualization_factor must be positive".to_string());
        }
        Ok(())
    }
}
