//! Augmented Dickey-Fuller residual-stationarity test.
//!
//! The scanner runs an Engle-Granger procedure: OLS hedge ratio, then an ADF
//! test on the regression residuals. The test statistic is mapped to an
//! approximate p-value by interpolating the MacKinnon surface for a
//! two-variable cointegrating regression with constant.
//!
//! # Mathematical Foundation
//! Under H0 (unit root): y[t] = y[t-1] + ε  (non-stationary random walk)
//! Under H1 (stationary): y[t] = ρ*y[t-1] + ε where |ρ| < 1
//!
//! We test: Δy[t] = γ*y[t-1] + ε where γ = ρ - 1
//! If γ < 0 significantly, reject H0 → series is stationary

/// (tau quantile, cumulative probability) for the residual ADF distribution,
/// two-variable case with constant (MacKinnon, 1994/2010 asymptotic values).
const MACKINNON_SURFACE: &[(f64, f64)] = &[
    (-4.62, 0.001),
    (-3.90, 0.01),
    (-3.59, 0.025),
    (-3.34, 0.05),
    (-3.04, 0.10),
    (-2.62, 0.25),
    (-2.17, 0.50),
    (-1.73, 0.75),
    (-1.30, 0.90),
    (-0.89, 0.975),
    (-0.45, 0.995),
];

/// Minimum observations for a reliable test.
pub const MIN_ADF_SAMPLES: usize = 20;

/// Compute the ADF t-statistic for a series.
///
/// Regresses the first difference on the demeaned lagged level and returns
/// the t-statistic of the coefficient (more negative = more stationary).
///
/// Returns `None` when the regression is singular (degenerate series) or the
/// statistic is not finite — the caller records the pair as untestable.
pub fn adf_statistic(series: &[f64]) -> Option<f64> {
    if series.len() < MIN_ADF_SAMPLES {
        return None;
    }

    let n = series.len() - 1; // number of first differences
    let n_f64 = n as f64;

    let mut delta_y: Vec<f64> = Vec::with_capacity(n);
    let mut y_lag: Vec<f64> = Vec::with_capacity(n);
    for i in 1..series.len() {
        delta_y.push(series[i] - series[i - 1]);
        y_lag.push(series[i - 1]);
    }

    // Demean for numerical stability.
    let y_lag_mean = y_lag.iter().sum::<f64>() / n_f64;
    let delta_y_mean = delta_y.iter().sum::<f64>() / n_f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let y_centered = y_lag[i] - y_lag_mean;
        let d_centered = delta_y[i] - delta_y_mean;
        numerator += y_centered * d_centered;
        denominator += y_centered * y_centered;
    }

    if denominator.abs() < f64::EPSILON {
        return None; // constant lagged level, regression is singular
    }

    let gamma = numerator / denominator;

    let mut sse = 0.0;
    for i in 0..n {
        let predicted = gamma * (y_lag[i] - y_lag_mean) + delta_y_mean;
        let residual = delta_y[i] - predicted;
        sse += residual * residual;
    }

    let mse = sse / (n_f64 - 1.0);
    let se_gamma = (mse / denominator).sqrt();
    if se_gamma.abs() < f64::EPSILON {
        // Perfect fit; the unit root is rejected with certainty.
        return Some(-1e6);
    }

    let t_statistic = gamma / se_gamma;
    t_statistic.is_finite().then_some(t_statistic)
}

/// Approximate p-value for an ADF statistic via linear interpolation of the
/// MacKinnon quantile surface, clamped to [0.001, 0.999].
pub fn mackinnon_pvalue(statistic: f64) -> f64 {
    let first = MACKINNON_SURFACE[0];
    let last = MACKINNON_SURFACE[MACKINNON_SURFACE.len() - 1];
    if statistic <= first.0 {
        return first.1;
    }
    if statistic >= last.0 {
        return 0.999;
    }
    for window in MACKINNON_SURFACE.windows(2) {
        let (tau_lo, p_lo) = window[0];
        let (tau_hi, p_hi) = window[1];
        if statistic <= tau_hi {
            let fraction = (statistic - tau_lo) / (tau_hi - tau_lo);
            return p_lo + fraction * (p_hi - p_lo);
        }
    }
    0.999
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adf_insufficient_data() {
        let series: Vec<f64> = (0..15).map(|x| x as f64).collect();
        assert_eq!(adf_statistic(&series), None);
    }

    #[test]
    fn test_adf_constant_series() {
        let series = vec![5.0; 50];
        assert_eq!(adf_statistic(&series), None);
    }

    #[test]
    fn test_adf_mean_reverting_is_negative() {
        // y[t] = 0.3 * y[t-1] + noise: strongly mean-reverting
        let mut series = Vec::with_capacity(100);
        let mut current = 10.0;
        for i in 0..100 {
            let noise = ((i * 31) % 11) as f64 / 10.0 - 0.5;
            current = 0.3 * current + noise;
            series.push(current);
        }
        let stat = adf_statistic(&series).unwrap();
        assert!(
            stat < -3.0,
            "mean-reverting series should have strongly negative ADF stat, got {:.2}",
            stat
        );
    }

    #[test]
    fn test_adf_random_walk_is_weak() {
        // Pure cumulative sum of pseudo-noise behaves like a unit root.
        let mut series = Vec::with_capacity(200);
        let mut level = 0.0;
        for i in 0..200u64 {
            let step = ((i.wrapping_mul(2654435761) >> 7) % 1000) as f64 / 500.0 - 1.0;
            level += step;
            series.push(level);
        }
        let stat = adf_statistic(&series).unwrap();
        assert!(
            stat > -3.9,
            "random walk should not reject the unit root at 1%, got {:.2}",
            stat
        );
    }

    #[test]
    fn test_pvalue_monotonic_in_statistic() {
        let stats = [-5.0, -4.0, -3.5, -3.0, -2.0, -1.0, 0.0];
        for pair in stats.windows(2) {
            assert!(
                mackinnon_pvalue(pair[0]) <= mackinnon_pvalue(pair[1]),
                "p-value must not decrease as the statistic increases"
            );
        }
    }

    #[test]
    fn test_pvalue_anchors() {
        assert!((mackinnon_pvalue(-3.90) - 0.01).abs() < 1e-9);
        assert!((mackinnon_pvalue(-3.34) - 0.05).abs() < 1e-9);
        assert_eq!(mackinnon_pvalue(-10.0), 0.001);
        assert_eq!(mackinnon_pvalue(2.0), 0.999);
    }
}
