//! Performance statistics — pure functions over a return series.
//!
//! Missing returns (the first step, or a step after a zero valuation) are
//! dropped before any statistic is computed. An empty series yields all
//! zeros with `num_days == 0`.

use serde::{Deserialize, Serialize};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics for one run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_vol: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub num_days: usize,
}

impl PerformanceStats {
    /// Compute every statistic from a return series that may contain gaps.
    pub fn compute(returns: &[Option<f64>]) -> Self {
        let r: Vec<f64> = returns
            .iter()
            .filter_map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        if r.is_empty() {
            return Self::default();
        }

        let annual_return = annual_return(&r);
        let annual_vol = annual_vol(&r);
        let sharpe = if annual_vol > 0.0 {
            annual_return / annual_vol
        } else {
            0.0
        };

        Self {
            total_return: total_return(&r),
            annual_return,
            annual_vol,
            sharpe,
            max_drawdown: max_drawdown(&r),
            num_days: r.len(),
        }
    }
}

// ─── Individual statistics ──────────────────────────────────────────

/// Π(1 + r) − 1.
pub fn total_return(returns: &[f64]) -> f64 {
    cumulative(returns).last().map_or(0.0, |c| c - 1.0)
}

/// (1 + mean)^252 − 1, and exactly −1 when the mean return is −1.
pub fn annual_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(returns);
    if mean == -1.0 {
        return -1.0;
    }
    (1.0 + mean).powf(TRADING_DAYS_PER_YEAR) - 1.0
}

/// Sample standard deviation × √252, or 0 when undefined or zero.
pub fn annual_vol(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if std > 0.0 {
        std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Worst peak-to-trough decline of the compounded return path, as a
/// non-positive fraction.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut running_max = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for c in cumulative(returns) {
        running_max = running_max.max(c);
        if running_max != 0.0 {
            worst = worst.min((c - running_max) / running_max);
        }
    }
    worst
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns of a valuation series. The first element is always `None`;
/// so is any step whose previous valuation is zero.
pub fn simple_returns(equity: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(equity.len());
    if equity.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(equity.windows(2).map(|w| {
        if w[0] != 0.0 {
            Some(w[1] / w[0] - 1.0)
        } else {
            None
        }
    }));
    out
}

/// Running product of (1 + r).
pub fn cumulative(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
