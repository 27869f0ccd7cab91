//! Kalman Filter for dynamic hedge ratio estimation.
//!
//! Implements a 1D Kalman Filter that tracks the hedge ratio (beta) between
//! the two legs of a candidate pair, adapting to drift in the cointegration
//! relationship.
//!
//! # Mathematical Model
//!
//! **State equation** (random walk):
//! ```text
//! β[t] = β[t-1] + w,  where w ~ N(0, Q)
//! ```
//!
//! **Observation equation**:
//! ```text
//! y[t] = β[t] * x[t] + v,  where v ~ N(0, R)
//! ```
//!
//! Where `y[t]` is leg A's price, `x[t]` is leg B's price, `Q` is process
//! noise (how fast beta drifts) and `R` is observation noise. The spread
//! reported for each step is the innovation `y - β_predicted * x`, i.e. the
//! observed deviation from the model's one-step prediction.
//!
//! # References
//!
//! - Avellaneda, M. & Lee, J.H. (2010). "Statistical Arbitrage in the US Equities Market"
//! - Chan, E. (2013). "Algorithmic Trading: Winning Strategies and Their Rationale"

/// One filter step's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanStep {
    /// Posterior hedge ratio after the update (prior one if degenerate).
    pub hedge_ratio: f64,
    /// Innovation: observed leg-A price minus the model's prediction.
    /// `NaN` when the observation itself was unusable.
    pub spread: f64,
    /// Posterior state covariance.
    pub covariance: f64,
    /// True when the update was skipped and the prior state retained.
    pub degenerate: bool,
}

/// Recursive hedge-ratio estimator for one pair. O(1) per update, no
/// historical storage.
#[derive(Debug, Clone)]
pub struct SpreadKalman {
    beta: f64,
    variance: f64,
    process_noise: f64,
    obs_noise: f64,
    degenerate_steps: u32,
}

impl SpreadKalman {
    /// Create a filter seeded with an initial hedge ratio (typically the
    /// scanner's static OLS estimate) and a prior covariance.
    pub fn new(initial_beta: f64, initial_covariance: f64, process_noise: f64, obs_noise: f64) -> Self {
        Self {
            beta: initial_beta,
            variance: initial_covariance,
            process_noise,
            obs_noise,
            degenerate_steps: 0,
        }
    }

    /// Advance the filter with a new observation pair.
    ///
    /// `x` is leg B's price, `y` leg A's price. Each step depends only on
    /// the previous state and this observation — no lookahead.
    ///
    /// # Numerical policy
    ///
    /// - Non-finite or near-zero inputs skip the update; the prior state is
    ///   retained and the step is marked degenerate.
    /// - Beta is clamped to [-10, 10] to prevent extreme hedge ratios during
    ///   regime breaks.
    /// - A posterior covariance that would come out non-positive (f64
    ///   degeneracy) also skips the update, retaining the prior covariance.
    pub fn step(&mut self, x: f64, y: f64) -> KalmanStep {
        const MIN_X: f64 = 1e-12;
        if !x.is_finite() || !y.is_finite() || x.abs() < MIN_X {
            return self.degenerate_step(f64::NAN);
        }

        // === PREDICT ===
        // Random-walk state: β_predicted = β_previous; P = P + Q
        let p_predicted = self.variance + self.process_noise;

        // === UPDATE ===
        // Observation matrix H = x. Innovation: y - β * x
        let innovation = y - self.beta * x;

        // Innovation covariance: S = x² * P + R
        let s = x * x * p_predicted + self.obs_noise;
        if s.abs() < f64::EPSILON {
            return self.degenerate_step(innovation);
        }

        // Kalman gain: K = P * x / S
        let kalman_gain = p_predicted * x / s;

        let updated_beta = (self.beta + kalman_gain * innovation).clamp(-10.0, 10.0);
        // Covariance update: P = (1 - K * x) * P
        let updated_variance = (1.0 - kalman_gain * x) * p_predicted;

        if !updated_variance.is_finite() || updated_variance <= 0.0 || !updated_beta.is_finite() {
            return self.degenerate_step(innovation);
        }

        self.beta = updated_beta;
        self.variance = updated_variance;

        KalmanStep {
            hedge_ratio: self.beta,
            spread: innovation,
            covariance: self.variance,
            degenerate: false,
        }
    }

    fn degenerate_step(&mut self, spread: f64) -> KalmanStep {
        self.degenerate_steps += 1;
        KalmanStep {
            hedge_ratio: self.beta,
            spread,
            covariance: self.variance,
            degenerate: true,
        }
    }

    #[inline]
    pub fn hedge_ratio(&self) -> f64 {
        self.beta
    }

    #[inline]
    pub fn covariance(&self) -> f64 {
        self.variance
    }

    /// Number of steps where the update was skipped.
    #[inline]
    pub fn degenerate_steps(&self) -> u32 {
        self.degenerate_steps
    }
}
