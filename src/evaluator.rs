//! Performance evaluation of a backtest result.
//!
//! Pure reductions over the equity curve and trade ledger; nothing here
//! mutates its inputs, so metrics can be recomputed at will.

use crate::backtest::{EquityPoint, Trade};
use crate::config::StrategyConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate statistics for one pair's backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Annualized Sharpe ratio of period returns, risk-free adjusted.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough equity decline, as a fraction of the peak.
    pub max_drawdown: f64,
    /// Final equity over initial capital, minus one.
    pub total_return: f64,
    /// Closed trades with positive net P&L over all closed trades.
    pub win_rate: f64,
    pub avg_trade_pnl: Decimal,
    pub trade_count: usize,
    pub open_trades: usize,
    /// Mean entry-to-exit span of closed trades, in timestamp units.
    pub avg_holding_period: f64,
    pub final_equity: Decimal,
}

/// Reduce an equity curve and trade ledger to summary metrics.
pub fn evaluate(
    equity_curve: &[EquityPoint],
    trades: &[Trade],
    config: &StrategyConfig,
) -> PerformanceMetrics {
    let returns = period_returns(equity_curve);
    let per_period_rf = config.risk_free_rate / config.annualization_factor;
    let sharpe_ratio = sharpe(&returns, per_period_rf, config.annualization_factor);
    let max_drawdown = max_drawdown(equity_curve);

    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(config.initial_capital);
    let total_return = if config.initial_capital.is_zero() {
        0.0
    } else {
        ((final_equity - config.initial_capital) / config.initial_capital)
            .to_f64()
            .unwrap_or(0.0)
    };

    let closed: Vec<&Trade> = trades.iter().filter(|t| !t.open).collect();
    let open_trades = trades.len() - closed.len();
    let wins = closed.iter().filter(|t| t.net_pnl > Decimal::ZERO).count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        wins as f64 / closed.len() as f64
    };

    let avg_trade_pnl = if closed.is_empty() {
        Decimal::ZERO
    } else {
        closed.iter().map(|t| t.net_pnl).sum::<Decimal>() / Decimal::from(closed.len())
    };

    let avg_holding_period = if closed.is_empty() {
        0.0
    } else {
        closed
            .iter()
            .filter_map(|t| t.exit_timestamp.map(|e| (e - t.entry_timestamp) as f64))
            .sum::<f64>()
            / closed.len() as f64
    };

    PerformanceMetrics {
        sharpe_ratio,
        max_drawdown,
        total_return,
        win_rate,
        avg_trade_pnl,
        trade_count: closed.len(),
        open_trades,
        avg_holding_period,
        final_equity,
    }
}

/// Simple period-over-period returns of the equity curve.
fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].equity.to_f64()?;
            let curr = w[1].equity.to_f64()?;
            if prev == 0.0 {
                None
            } else {
                Some(curr / prev - 1.0)
            }
        })
        .collect()
}

/// Annualized Sharpe ratio with sample (n-1) standard deviation.
fn sharpe(returns: &[f64], per_period_rf: f64, annualization_factor: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();
    let mean = excess.iter().sum::<f64>() / n;
    let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        0.0
    } else {
        (mean / std_dev) * annualization_factor.sqrt()
    }
}

/// Largest fractional decline from a running equity peak.
fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for point in equity_curve {
        let equity = point.equity.to_f64().unwrap_or(0.0);
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}
