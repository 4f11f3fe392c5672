//! Synthetic co-integrated pair for demos and tests.
//!
//! X follows a bounded random walk; Y is `alpha + beta * X + s` where the
//! spread `s` mean-reverts (AR(1) with uniform shocks). The generator is
//! seeded from the pair label, so the same pair and date range always give
//! the same prices. Results built on this data are tagged as synthetic.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_loader::PriceTable;

/// Parameters of the generated relationship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticParams {
    pub alpha: f64,
    pub beta: f64,
    pub x_start: f64,
    /// AR(1) coefficient of the spread, in [0, 1).
    pub persistence: f64,
    /// Half-width of the uniform spread shock.
    pub spread_shock: f64,
    /// Half-width of the uniform daily return of X.
    pub x_step: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            alpha: 5.0,
            beta: 1.5,
            x_start: 50.0,
            persistence: 0.9,
            spread_shock: 1.0,
            x_step: 0.015,
        }
    }
}

/// Generate a two-column price table for `y`/`x` over weekdays in
/// `[start, end]`.
pub fn generate_pair(
    y: &str,
    x: &str,
    start: NaiveDate,
    end: NaiveDate,
    params: &SyntheticParams,
) -> PriceTable {
    tracing::warn!(y, x, "generating synthetic prices; results will be tagged synthetic");

    let seed: [u8; 32] = *blake3::hash(format!("{y}_{x}").as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    let mut price_x = params.x_start;
    let mut spread = 0.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        price_x = (price_x * (1.0 + rng.gen_range(-params.x_step..params.x_step))).max(1.0);
        spread = params.persistence * spread
            + rng.gen_range(-params.spread_shock..params.spread_shock);
        let price_y = (params.alpha + params.beta * price_x + spread).max(1.0);

        dates.push(current);
        rows.push(vec![Some(price_y), Some(price_x)]);
        current += chrono::Duration::days(1);
    }

    PriceTable {
        tickers: vec![y.to_string(), x.to_string()],
        dates,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlab_core::estimator::fit_ols;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
        )
    }

    #[test]
    fn deterministic_per_pair() {
        let (s, e) = range();
        let p = SyntheticParams::default();
        assert_eq!(generate_pair("AAA", "BBB", s, e, &p), generate_pair("AAA", "BBB", s, e, &p));
        assert_ne!(generate_pair("AAA", "BBB", s, e, &p), generate_pair("AAA", "CCC", s, e, &p));
    }

    #[test]
    fn weekdays_only_and_positive() {
        let (s, e) = range();
        let table = generate_pair("AAA", "BBB", s, e, &SyntheticParams::default());
        assert!(table
            .dates
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(table.rows.iter().flatten().all(|v| matches!(v, Some(p) if *p > 0.0)));
        assert_eq!(table.tickers, vec!["AAA", "BBB"]);
    }

    #[test]
    fn recovers_hedge_ratio() {
        let s = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let e = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
        let params = SyntheticParams::default();
        let table = generate_pair("AAA", "BBB", s, e, &params);
        let frame = table.select_pair("AAA", "BBB").unwrap();
        let fit = fit_ols(&frame.price_y, &frame.price_x).unwrap();
        assert!((fit.beta - params.beta).abs() < 0.3, "beta {}", fit.beta);
        assert!(fit.r_squared > 0.5, "r2 {}", fit.r_squared);
    }

    #[test]
    fn empty_range_is_empty() {
        let (s, _) = range();
        let end = s - chrono::Duration::days(1);
        let table = generate_pair("AAA", "BBB", s, end, &SyntheticParams::default());
        assert!(table.is_empty());
    }
}
