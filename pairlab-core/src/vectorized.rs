//! Return-based signal backtest.
//!
//! A fast approximation of the paper engine that works on returns instead of
//! share quantities: the position decided at the close of step `t-1` earns the
//! spread return of step `t`, and every change in that lagged position pays
//! `fee_rate` per unit of turnover.
//!
//! ```text
//! spread_ret[t]   = ret_y[t] - beta * ret_x[t]
//! turnover[t]     = |pos[t-1] - pos[t-2]|
//! strategy_ret[t] = pos[t-1] * spread_ret[t] - fee_rate * turnover[t]
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{PairFrame, SpreadPosition};
use crate::engine::EngineConfig;
use crate::error::SimResult;
use crate::estimator::fit_ols;
use crate::metrics::PerformanceStats;
use crate::signal::positions_for;
use crate::spread::resolve_zscore;

/// Output of a return-based backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizedRun {
    pub beta: f64,
    pub positions: Vec<SpreadPosition>,
    pub strategy_returns: Vec<Option<f64>>,
    /// Growth of 1.0, missing returns counted as zero.
    pub equity_curve: Vec<f64>,
    pub stats: PerformanceStats,
}

/// Run the return-based backtest. Estimates beta by OLS unless one is given.
pub fn run_vectorized(
    frame: &PairFrame,
    config: &EngineConfig,
    beta: Option<f64>,
) -> SimResult<VectorizedRun> {
    config.validate()?;
    frame.validate()?;
    let beta = match beta {
        Some(b) => b,
        None => fit_ols(&frame.price_y, &frame.price_x)?.beta,
    };

    let zscores = resolve_zscore(frame, beta, config.window);
    let positions = positions_for(&zscores.values, &config.thresholds());
    let strategy_returns =
        strategy_returns(&frame.price_y, &frame.price_x, &positions, beta, config.fee_rate);

    let equity_curve = strategy_returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r.unwrap_or(0.0);
            Some(*acc)
        })
        .collect();
    let stats = PerformanceStats::compute(&strategy_returns);

    Ok(VectorizedRun {
        beta,
        positions,
        strategy_returns,
        equity_curve,
        stats,
    })
}

/// Per-step strategy returns for a given position path.
pub fn strategy_returns(
    price_y: &[Option<f64>],
    price_x: &[Option<f64>],
    positions: &[SpreadPosition],
    beta: f64,
    fee_rate: f64,
) -> Vec<Option<f64>> {
    let n = positions.len();
    let ret_y = pct_change(price_y);
    let ret_x = pct_change(price_x);

    let lagged: Vec<f64> = (0..n)
        .map(|t| if t == 0 { 0.0 } else { positions[t - 1].as_f64() })
        .collect();

    (0..n)
        .map(|t| {
            let turnover = if t == 0 {
                0.0
            } else {
                (lagged[t] - lagged[t - 1]).abs()
            };
            match (ret_y[t], ret_x[t]) {
                (Some(ry), Some(rx)) => {
                    let spread_ret = ry - beta * rx;
                    Some(lagged[t] * spread_ret - fee_rate * turnover)
                }
                _ => None,
            }
        })
        .collect()
}

fn pct_change(prices: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(prices.len());
    for t in 0..prices.len() {
        let r = if t == 0 {
            None
        } else {
            match (prices[t - 1], prices[t]) {
                (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                _ => None,
            }
        };
        out.push(r);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use SpreadPosition::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn position_earns_next_step_spread_return() {
        let y = some(&[100.0, 110.0, 121.0]);
        let x = some(&[50.0, 50.0, 50.0]);
        let r = strategy_returns(&y, &x, &[Long, Long, Flat], 1.0, 0.0);
        assert_eq!(r[0], None);
        // lagged position at t=1 is Long, spread return 0.10
        assert!((r[1].unwrap() - 0.10).abs() < 1e-12);
        assert!((r[2].unwrap() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn turnover_cost_applies_on_lagged_change() {
        let y = some(&[100.0, 100.0, 100.0, 100.0]);
        let x = some(&[50.0, 50.0, 50.0, 50.0]);
        let r = strategy_returns(&y, &x, &[Short, Long, Long, Long], 1.0, 0.01);
        // lagged: 0, -1, 1, 1 → turnover 0, 1, 2, 0
        assert_eq!(r[1], Some(-0.01));
        assert_eq!(r[2], Some(-0.02));
        assert_eq!(r[3], Some(0.0));
    }

    #[test]
    fn missing_price_gives_missing_return() {
        let y = vec![Some(100.0), None, Some(100.0)];
        let x = some(&[50.0, 50.0, 50.0]);
        let r = strategy_returns(&y, &x, &[Flat, Flat, Flat], 1.0, 0.0);
        assert_eq!(r, vec![None, None, None]);
    }

    #[test]
    fn flat_series_produce_flat_equity() {
        let dates: Vec<NaiveDate> = (0..20)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        let frame = PairFrame::from_prices("Y", "X", dates, &[100.0; 20], &[50.0; 20]);
        let config = EngineConfig {
            window: 5,
            ..EngineConfig::default()
        };
        let run = run_vectorized(&frame, &config, Some(1.0)).unwrap();
        assert!(run.positions.iter().all(|p| p.is_flat()));
        assert!(run.equity_curve.iter().all(|&e| e == 1.0));
        assert_eq!(run.stats.total_return, 0.0);
        assert_eq!(run.stats.num_days, 19);
    }
}
