//! Spread and z-score generation.
//!
//! The spread is `y - beta * x`. The z-score is either taken verbatim from a
//! supplied column or computed as a rolling standardization of the spread.
//! A missing value anywhere in a rolling window makes that window's z-score
//! missing; so does a zero (or numerically negligible) rolling deviation.

use serde::{Deserialize, Serialize};

use crate::domain::PairFrame;
use crate::error::{SimError, SimResult};

/// Relative floor below which a standard deviation is treated as zero.
const STD_FLOOR: f64 = 1e-12;

/// Where the z-score column of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZScoreSource {
    /// Supplied by the caller and used without recomputation.
    Supplied,
    /// Rolling mean/std over the spread.
    Rolling { window: usize },
}

/// Z-score column plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ZScoreSeries {
    pub values: Vec<Option<f64>>,
    pub source: ZScoreSource,
}

/// `y - beta * x` for each row where both prices exist.
pub fn spread_series(y: &[Option<f64>], x: &[Option<f64>], beta: f64) -> Vec<Option<f64>> {
    y.iter()
        .zip(x.iter())
        .map(|(&yi, &xi)| match (yi, xi) {
            (Some(a), Some(b)) => Some(a - beta * b),
            _ => None,
        })
        .collect()
}

/// Rolling z-score with a window of `window` observations (sample std).
///
/// `z[t]` is defined only when all of `spread[t-window+1..=t]` are present.
pub fn rolling_zscore(spread: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = spread.len();
    let mut result = vec![None; n];
    if window < 2 || n < window {
        return result;
    }

    let mut buf: Vec<f64> = Vec::with_capacity(window);
    for t in (window - 1)..n {
        buf.clear();
        buf.extend(spread[(t + 1 - window)..=t].iter().map_while(|v| *v));
        if buf.len() < window {
            continue;
        }
        let (mean, std) = mean_and_sample_std(&buf);
        if is_negligible(std, mean) {
            continue;
        }
        if let Some(current) = spread[t] {
            result[t] = Some((current - mean) / std);
        }
    }
    result
}

/// Mean and sample standard deviation over all present spread values.
///
/// Fails when fewer than two values are present or the deviation is zero.
pub fn spread_moments(spread: &[Option<f64>]) -> SimResult<(f64, f64)> {
    let present: Vec<f64> = spread.iter().filter_map(|v| *v).collect();
    if present.len() < 2 {
        return Err(SimError::InsufficientData {
            needed: 2,
            found: present.len(),
        });
    }
    let (mean, std) = mean_and_sample_std(&present);
    if is_negligible(std, mean) {
        return Err(SimError::DegenerateInput(
            "spread standard deviation is zero".into(),
        ));
    }
    Ok((mean, std))
}

/// Full-sample z-score: one mean and one sample std over all present values.
pub fn full_sample_zscore(spread: &[Option<f64>]) -> SimResult<Vec<Option<f64>>> {
    let (mean, std) = spread_moments(spread)?;
    Ok(spread.iter().map(|v| v.map(|s| (s - mean) / std)).collect())
}

/// Pick the z-score for a run: the frame's column if supplied, otherwise a
/// rolling z-score over the frame's spread (or `y - beta * x` if it has none).
pub fn resolve_zscore(frame: &PairFrame, beta: f64, window: usize) -> ZScoreSeries {
    if let Some(z) = &frame.zscore {
        return ZScoreSeries {
            values: z.clone(),
            source: ZScoreSource::Supplied,
        };
    }
    let computed;
    let spread = match &frame.spread {
        Some(s) => s.as_slice(),
        None => {
            computed = spread_series(&frame.price_y, &frame.price_x, beta);
            computed.as_slice()
        }
    };
    ZScoreSeries {
        values: rolling_zscore(spread, window),
        source: ZScoreSource::Rolling { window },
    }
}

pub(crate) fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}

fn is_negligible(std: f64, mean: f64) -> bool {
    !std.is_finite() || std <= STD_FLOOR * mean.abs().max(1.0)
}
