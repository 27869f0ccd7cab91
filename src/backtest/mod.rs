//! Backtest engine: replays a signal sequence against price history.
//!
//! Execution model is next-bar: a transition signalled at bar t is filled at
//! bar t+1's price, adjusted adversely by slippage and charged proportional
//! plus fixed fees. Money is accounted in `Decimal`; statistics stay `f64`.

use crate::config::{Neutrality, PositionSizing, StrategyConfig};
use crate::error::PairFailureKind;
use crate::model::SpreadSeries;
use crate::signal::SignalSeries;
use crate::types::{PairId, PositionState};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

const BPS_DENOMINATOR: Decimal = dec!(10_000);

/// One round trip (or still-open position) in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub pair: PairId,
    /// LongSpread or ShortSpread.
    pub direction: PositionState,
    pub entry_timestamp: i64,
    pub entry_price_a: Decimal,
    pub entry_price_b: Decimal,
    pub exit_timestamp: Option<i64>,
    pub exit_price_a: Option<Decimal>,
    pub exit_price_b: Option<Decimal>,
    pub qty_a: Decimal,
    pub qty_b: Decimal,
    /// P&L from fill prices (slippage already embedded), before fees.
    pub gross_pnl: Decimal,
    /// Total fees charged on this trade.
    pub costs: Decimal,
    pub net_pnl: Decimal,
    /// True when the horizon ended with the position still on.
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Trade ledger and mark-to-market equity curve for one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub pair: PairId,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// An entered position awaiting its exit fill.
struct OpenPosition {
    direction: PositionState,
    entry_timestamp: i64,
    entry_price_a: Decimal,
    entry_price_b: Decimal,
    qty_a: Decimal,
    qty_b: Decimal,
    entry_costs: Decimal,
}

impl OpenPosition {
    /// Unrealized P&L at the given marks (no exit slippage or fees).
    fn unrealized(&self, mark_a: Decimal, mark_b: Decimal) -> Decimal {
        let leg_a = self.qty_a * (mark_a - self.entry_price_a);
        let leg_b = self.qty_b * (mark_b - self.entry_price_b);
        match self.direction {
            PositionState::LongSpread => leg_a - leg_b,
            PositionState::ShortSpread => leg_b - leg_a,
            PositionState::Flat => Decimal::ZERO,
        }
    }
}

/// Replay the signal sequence over the pair's aligned price series.
///
/// `spread` supplies the hedge ratio in force at each signal timestamp;
/// sizing decisions use the signal bar's values and fills use the next
/// bar's prices, so nothing looks ahead.
pub fn run(
    spread: &SpreadSeries,
    signals: &SignalSeries,
    prices_a: &[f64],
    prices_b: &[f64],
    config: &StrategyConfig,
) -> Result<BacktestResult, PairFailureKind> {
    let n = signals.points.len();
    debug_assert_eq!(n, prices_a.len());
    debug_assert_eq!(n, prices_b.len());
    debug_assert_eq!(n, spread.states.len());

    let slippage = config.slippage_bps / BPS_DENOMINATOR;
    let fee_rate = config.fee_bps / BPS_DENOMINATOR;

    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(n);
    let mut realized = Decimal::ZERO;
    let mut position: Option<OpenPosition> = None;
    let mut last_equity = config.initial_capital;

    for i in 0..n {
        let timestamp = signals.points[i].timestamp;

        // Fill any transition signalled on the previous bar.
        if i > 0 {
            let desired = signals.points[i - 1].state;
            let held = position
                .as_ref()
                .map(|p| p.direction)
                .unwrap_or(PositionState::Flat);

            if desired != held {
                let price_a = fill_reference(prices_a[i], timestamp)?;
                let price_b = fill_reference(prices_b[i], timestamp)?;

                if let Some(open) = position.take() {
                    // Closing leg directions are the reverse of entry.
                    let (exit_a, exit_b) = match open.direction {
                        PositionState::LongSpread => (
                            price_a * (Decimal::ONE - slippage),
                            price_b * (Decimal::ONE + slippage),
                        ),
                        _ => (
                            price_a * (Decimal::ONE + slippage),
                            price_b * (Decimal::ONE - slippage),
                        ),
                    };
                    let exit_notional = open.qty_a * exit_a + open.qty_b * exit_b;
                    let exit_costs = exit_notional * fee_rate + config.fee_fixed;
                    let gross = open.unrealized(exit_a, exit_b);
                    let costs = open.entry_costs + exit_costs;
                    realized += gross - costs;
                    trades.push(Trade {
                        pair: signals.pair.clone(),
                        direction: open.direction,
                        entry_timestamp: open.entry_timestamp,
                        entry_price_a: open.entry_price_a,
                        entry_price_b: open.entry_price_b,
                        exit_timestamp: Some(timestamp),
                        exit_price_a: Some(exit_a),
                        exit_price_b: Some(exit_b),
                        qty_a: open.qty_a,
                        qty_b: open.qty_b,
                        gross_pnl: gross,
                        costs,
                        net_pnl: gross - costs,
                        open: false,
                    });
                } else {
                    // Sizing context comes from the signal bar, not the fill bar.
                    let signal = &signals.points[i - 1];
                    let hedge_ratio = spread.states[i - 1].hedge_ratio;
                    let (fill_a, fill_b) = match desired {
                        PositionState::LongSpread => (
                            price_a * (Decimal::ONE + slippage),
                            price_b * (Decimal::ONE - slippage),
                        ),
                        _ => (
                            price_a * (Decimal::ONE - slippage),
                            price_b * (Decimal::ONE + slippage),
                        ),
                    };
                    let equity = config.initial_capital + realized;
                    let qty_a = leg_a_quantity(config, equity, fill_a, signal.volatility)
                        * decimal_from(signal.weight);
                    let qty_b = match config.neutrality {
                        Neutrality::Ratio => decimal_from(hedge_ratio.abs()) * qty_a,
                        Neutrality::Dollar => {
                            if fill_b.is_zero() {
                                Decimal::ZERO
                            } else {
                                qty_a * fill_a / fill_b
                            }
                        }
                    };
                    let entry_notional = qty_a * fill_a + qty_b * fill_b;
                    let entry_costs = entry_notional * fee_rate + config.fee_fixed;
                    position = Some(OpenPosition {
                        direction: desired,
                        entry_timestamp: timestamp,
                        entry_price_a: fill_a,
                        entry_price_b: fill_b,
                        qty_a,
                        qty_b,
                        entry_costs,
                    });
                }
            }
        }

        // Mark to market. A missing price with no position on is harmless;
        // with a position on, the last known mark is carried forward.
        let equity = match &position {
            Some(open) => {
                if prices_a[i].is_finite() && prices_b[i].is_finite() {
                    config.initial_capital + realized
                        + open.unrealized(decimal_from(prices_a[i]), decimal_from(prices_b[i]))
                        - open.entry_costs
                } else {
                    last_equity
                }
            }
            None => config.initial_capital + realized,
        };
        last_equity = equity;
        equity_curve.push(EquityPoint { timestamp, equity });
    }

    // A position still on at the horizon end is reported, flagged open,
    // marked at the final usable prices without exit slippage or fees.
    if let Some(open) = position.take() {
        let last = n - 1;
        let gross = if prices_a[last].is_finite() && prices_b[last].is_finite() {
            open.unrealized(decimal_from(prices_a[last]), decimal_from(prices_b[last]))
        } else {
            Decimal::ZERO
        };
        trades.push(Trade {
            pair: signals.pair.clone(),
            direction: open.direction,
            entry_timestamp: open.entry_timestamp,
            entry_price_a: open.entry_price_a,
            entry_price_b: open.entry_price_b,
            exit_timestamp: None,
            exit_price_a: None,
            exit_price_b: None,
            qty_a: open.qty_a,
            qty_b: open.qty_b,
            gross_pnl: gross,
            costs: open.entry_costs,
            net_pnl: gross - open.entry_costs,
            open: true,
        });
    }

    debug!(
        pair = %signals.pair,
        trades = trades.len(),
        final_equity = %last_equity,
        "Backtest complete"
    );

    Ok(BacktestResult {
        pair: signals.pair.clone(),
        trades,
        equity_curve,
    })
}

/// Leg-A quantity under the configured sizing rule.
fn leg_a_quantity(
    config: &StrategyConfig,
    equity: Decimal,
    fill_a: Decimal,
    volatility: f64,
) -> Decimal {
    match config.position_sizing_rule {
        PositionSizing::FixedFraction { fraction } => {
            if fill_a.is_zero() {
                Decimal::ZERO
            } else {
                equity * decimal_from(fraction) / fill_a
            }
        }
        PositionSizing::FixedUnit { units } => units,
        PositionSizing::InverseVolatility { risk_fraction } => {
            let floored = volatility.max(config.volatility_band_min);
            equity * decimal_from(risk_fraction) / decimal_from(floored)
        }
    }
}

/// Reference price for a fill; a gap here aborts the pair's backtest.
fn fill_reference(price: f64, timestamp: i64) -> Result<Decimal, PairFailureKind> {
    Decimal::from_f64(price).ok_or(PairFailureKind::ExecutionDataGap { timestamp })
}

fn decimal_from(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpreadState;
    use crate::signal::Signal;
    use crate::types::Regime;

    fn pair() -> PairId {
        PairId::new("A", "B")
    }

    fn spread_series(n: usize, hedge_ratio: f64) -> SpreadSeries {
        SpreadSeries {
            pair: pair(),
            states: (0..n)
                .map(|i| SpreadState {
                    timestamp: i as i64,
                    hedge_ratio,
                    spread: 0.0,
                    covariance: 0.1,
                    degenerate: false,
                })
                .collect(),
            degenerate_steps: 0,
        }
    }

    fn signal_series(states: &[PositionState]) -> SignalSeries {
        SignalSeries {
            pair: pair(),
            points: states
                .iter()
                .enumerate()
                .map(|(i, &state)| Signal {
                    timestamp: i as i64,
                    state,
                    regime: Regime::MeanReverting,
                    z_score: 0.0,
                    volatility: 1.0,
                    weight: 1.0,
                })
                .collect(),
        }
    }

    fn frictionless_config() -> StrategyConfig {
        StrategyConfig {
            slippage_bps: Decimal::ZERO,
            fee_bps: Decimal::ZERO,
            fee_fixed: Decimal::ZERO,
            position_sizing_rule: PositionSizing::FixedUnit { units: dec!(1) },
            initial_capital: dec!(100_000),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_pnl_is_exact() {
        use PositionState::*;
        // Signal at bar 1, fill at bar 2 (100), exit signal at bar 2,
        // exit fill at bar 3 (110). Hedge ratio 0 keeps leg B out.
        let cfg = frictionless_config();
        let prices_a = [100.0, 100.0, 100.0, 110.0];
        let prices_b = [50.0, 50.0, 50.0, 50.0];
        let signals = signal_series(&[Flat, LongSpread, Flat, Flat]);
        let spread = spread_series(4, 0.0);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert!(!trade.open);
        assert_eq!(trade.entry_price_a, dec!(100));
        assert_eq!(trade.exit_price_a, Some(dec!(110)));
        assert_eq!(trade.net_pnl, dec!(10));
        assert_eq!(result.equity_curve.last().unwrap().equity, dec!(100_010));
    }

    #[test]
    fn test_slippage_shifts_fill_adversely() {
        use PositionState::*;
        let cfg = StrategyConfig {
            slippage_bps: dec!(10),
            ..frictionless_config()
        };
        let prices_a = [100.0, 100.0, 100.0];
        let prices_b = [100.0, 100.0, 100.0];
        let signals = signal_series(&[Flat, LongSpread, LongSpread]);
        let spread = spread_series(3, 1.0);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        let trade = &result.trades[0];
        // Long the spread: buy A above, sell B below the reference.
        assert_eq!(trade.entry_price_a, dec!(100.10));
        assert_eq!(trade.entry_price_b, dec!(99.90));
    }

    #[test]
    fn test_equity_starts_at_initial_capital() {
        use PositionState::*;
        let cfg = frictionless_config();
        let prices = [100.0, 101.0, 99.0];
        let signals = signal_series(&[Flat, Flat, Flat]);
        let spread = spread_series(3, 1.0);

        let result = run(&spread, &signals, &prices, &prices, &cfg).unwrap();
        assert_eq!(result.equity_curve[0].equity, dec!(100_000));
        assert_eq!(result.equity_curve.len(), 3);
        let ts: Vec<i64> = result.equity_curve.iter().map(|p| p.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_replay_is_idempotent() {
        use PositionState::*;
        let cfg = StrategyConfig {
            slippage_bps: dec!(5),
            fee_bps: dec!(10),
            ..frictionless_config()
        };
        let prices_a = [100.0, 100.0, 102.0, 104.0, 103.0, 101.0];
        let prices_b = [50.0, 50.0, 51.0, 52.0, 51.5, 50.5];
        let signals = signal_series(&[Flat, ShortSpread, ShortSpread, Flat, Flat, LongSpread]);
        let spread = spread_series(6, 2.0);

        let first = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        let second = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_fill_price_aborts_pair() {
        use PositionState::*;
        let cfg = frictionless_config();
        let prices_a = [100.0, 100.0, f64::NAN, 100.0];
        let prices_b = [50.0, 50.0, 50.0, 50.0];
        let signals = signal_series(&[Flat, LongSpread, LongSpread, LongSpread]);
        let spread = spread_series(4, 1.0);

        let err = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap_err();
        assert_eq!(err, PairFailureKind::ExecutionDataGap { timestamp: 2 });
    }

    #[test]
    fn test_ratio_neutral_leg_sizing() {
        use PositionState::*;
        let cfg = frictionless_config();
        let prices_a = [100.0, 100.0, 100.0];
        let prices_b = [40.0, 40.0, 40.0];
        let signals = signal_series(&[Flat, LongSpread, LongSpread]);
        let spread = spread_series(3, 2.5);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        let trade = &result.trades[0];
        assert_eq!(trade.qty_a, dec!(1));
        assert_eq!(trade.qty_b, dec!(2.5));
        assert!(trade.open);
    }

    #[test]
    fn test_dollar_neutral_leg_sizing() {
        use PositionState::*;
        let cfg = StrategyConfig {
            neutrality: Neutrality::Dollar,
            ..frictionless_config()
        };
        let prices_a = [100.0, 100.0, 100.0];
        let prices_b = [40.0, 40.0, 40.0];
        let signals = signal_series(&[Flat, LongSpread, LongSpread]);
        let spread = spread_series(3, 2.5);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        let trade = &result.trades[0];
        // Equal notional on both legs.
        assert_eq!(
            trade.qty_a * trade.entry_price_a,
            trade.qty_b * trade.entry_price_b
        );
    }

    #[test]
    fn test_fees_reduce_net_pnl() {
        use PositionState::*;
        let cfg = StrategyConfig {
            fee_bps: dec!(10),
            ..frictionless_config()
        };
        let prices_a = [100.0, 100.0, 100.0, 110.0];
        let prices_b = [50.0, 50.0, 50.0, 50.0];
        let signals = signal_series(&[Flat, LongSpread, Flat, Flat]);
        let spread = spread_series(4, 0.0);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        let trade = &result.trades[0];
        // 10 bps on 100 entry notional plus 10 bps on 110 exit notional.
        assert_eq!(trade.gross_pnl, dec!(10));
        assert_eq!(trade.costs, dec!(0.21));
        assert_eq!(trade.net_pnl, dec!(9.79));
    }

    #[test]
    fn test_short_spread_profits_when_spread_narrows() {
        use PositionState::*;
        let cfg = frictionless_config();
        // Short the spread: sell A, buy B. A falls, B holds.
        let prices_a = [100.0, 100.0, 100.0, 95.0];
        let prices_b = [50.0, 50.0, 50.0, 50.0];
        let signals = signal_series(&[Flat, ShortSpread, Flat, Flat]);
        let spread = spread_series(4, 0.0);

        let result = run(&spread, &signals, &prices_a, &prices_b, &cfg).unwrap();
        assert_eq!(result.trades[0].net_pnl, dec!(5));
    }
}
