//! Offline hedge-ratio diagnostics for one pair.
//!
//! Fits OLS over the full history, forms the spread with the fitted beta,
//! and standardizes it with a single full-sample mean and sample std. The
//! resulting table doubles as a signal file for later runs (it carries
//! `date`, `spread` and `zscore_full`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pairlab_core::domain::PairFrame;
use pairlab_core::error::SimResult;
use pairlab_core::estimator::{fit_ols, OlsFit};
use pairlab_core::spread::{full_sample_zscore, spread_moments, spread_series};

/// Hedge fit plus the spread table it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeReport {
    pub y_ticker: String,
    pub x_ticker: String,
    pub fit: OlsFit,
    pub spread_mean: f64,
    pub spread_std: f64,
    pub rows: Vec<HedgeRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeRow {
    pub date: NaiveDate,
    pub price_y: f64,
    pub price_x: f64,
    pub spread: f64,
    pub zscore_full: f64,
}

/// Build the report. Rows where either leg is missing are left out.
pub fn hedge_report(frame: &PairFrame) -> SimResult<HedgeReport> {
    frame.validate()?;
    let fit = fit_ols(&frame.price_y, &frame.price_x)?;
    let spread = spread_series(&frame.price_y, &frame.price_x, fit.beta);
    let (spread_mean, spread_std) = spread_moments(&spread)?;
    let zscore = full_sample_zscore(&spread)?;

    let rows = (0..frame.len())
        .filter_map(|t| {
            Some(HedgeRow {
                date: frame.dates[t],
                price_y: frame.price_y[t]?,
                price_x: frame.price_x[t]?,
                spread: spread[t]?,
                zscore_full: zscore[t]?,
            })
        })
        .collect();

    tracing::info!(
        pair = %format!("{}_{}", frame.y_ticker, frame.x_ticker),
        beta = fit.beta,
        alpha = fit.alpha,
        r_squared = fit.r_squared,
        mean = spread_mean,
        std = spread_std,
        "hedge fit"
    );

    Ok(HedgeReport {
        y_ticker: frame.y_ticker.clone(),
        x_ticker: frame.x_ticker.clone(),
        fit,
        spread_mean,
        spread_std,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlab_core::error::SimError;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn report_standardizes_spread() {
        let x: Vec<f64> = (0..50).map(|i| 20.0 + i as f64 * 0.5).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 3.0 + 2.0 * v + if i % 2 == 0 { 0.4 } else { -0.4 })
            .collect();
        let frame = PairFrame::from_prices("Y", "X", dates(50), &y, &x);
        let report = hedge_report(&frame).unwrap();

        assert!((report.fit.beta - 2.0).abs() < 0.05);
        assert_eq!(report.rows.len(), 50);
        let mean_z: f64 = report.rows.iter().map(|r| r.zscore_full).sum::<f64>() / 50.0;
        assert!(mean_z.abs() < 1e-9);
        let row = report.rows[7];
        assert!((row.spread - (row.price_y - report.fit.beta * row.price_x)).abs() < 1e-12);
        assert!(
            ((row.spread - report.spread_mean) / report.spread_std - row.zscore_full).abs() < 1e-12
        );
    }

    #[test]
    fn missing_rows_are_skipped() {
        let x: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| v * 1.5 + (i % 3) as f64).collect();
        let mut frame = PairFrame::from_prices("Y", "X", dates(10), &y, &x);
        frame.price_y[4] = None;
        let report = hedge_report(&frame).unwrap();
        assert_eq!(report.rows.len(), 9);
        assert!(report.rows.iter().all(|r| r.date != frame.dates[4]));
    }

    #[test]
    fn perfect_fit_has_degenerate_spread() {
        let x: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let frame = PairFrame::from_prices("Y", "X", dates(10), &y, &x);
        assert!(matches!(
            hedge_report(&frame),
            Err(SimError::DegenerateInput(_))
        ));
    }
}
