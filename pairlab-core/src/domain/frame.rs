//! PairFrame — the time-indexed input table for one pair.
//!
//! Columnar layout: every column has the same length as `dates`. Missing
//! values are `None` (a NaN read from upstream is normalized to `None`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Aligned price history for a Y/X pair plus optional precomputed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFrame {
    pub y_ticker: String,
    pub x_ticker: String,
    /// Trading dates, strictly increasing.
    pub dates: Vec<NaiveDate>,
    pub price_y: Vec<Option<f64>>,
    pub price_x: Vec<Option<f64>>,
    /// Precomputed spread. When absent the engine derives it from beta.
    pub spread: Option<Vec<Option<f64>>>,
    /// Precomputed z-score. When present it is used verbatim.
    pub zscore: Option<Vec<Option<f64>>>,
}

impl PairFrame {
    pub fn new(
        y_ticker: impl Into<String>,
        x_ticker: impl Into<String>,
        dates: Vec<NaiveDate>,
        price_y: Vec<Option<f64>>,
        price_x: Vec<Option<f64>>,
    ) -> Self {
        Self {
            y_ticker: y_ticker.into(),
            x_ticker: x_ticker.into(),
            dates,
            price_y: normalize(price_y),
            price_x: normalize(price_x),
            spread: None,
            zscore: None,
        }
    }

    /// Build a frame where every price is present.
    pub fn from_prices(
        y_ticker: impl Into<String>,
        x_ticker: impl Into<String>,
        dates: Vec<NaiveDate>,
        price_y: &[f64],
        price_x: &[f64],
    ) -> Self {
        Self::new(
            y_ticker,
            x_ticker,
            dates,
            price_y.iter().map(|&p| Some(p)).collect(),
            price_x.iter().map(|&p| Some(p)).collect(),
        )
    }

    pub fn with_spread(mut self, spread: Vec<Option<f64>>) -> Self {
        self.spread = Some(normalize(spread));
        self
    }

    pub fn with_zscore(mut self, zscore: Vec<Option<f64>>) -> Self {
        self.zscore = Some(normalize(zscore));
        self
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Structural checks: equal column lengths, unique strictly increasing dates,
    /// distinct tickers.
    pub fn validate(&self) -> SimResult<()> {
        if self.y_ticker == self.x_ticker {
            return Err(SimError::InvalidInput(format!(
                "pair legs must be distinct tickers, got '{}' twice",
                self.y_ticker
            )));
        }

        let n = self.dates.len();
        let check_len = |name: &str, len: usize| {
            if len != n {
                Err(SimError::InvalidInput(format!(
                    "column '{name}' has {len} rows, expected {n}"
                )))
            } else {
                Ok(())
            }
        };
        check_len("price_y", self.price_y.len())?;
        check_len("price_x", self.price_x.len())?;
        if let Some(spread) = &self.spread {
            check_len("spread", spread.len())?;
        }
        if let Some(z) = &self.zscore {
            check_len("zscore", z.len())?;
        }

        if let Some(w) = self.dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SimError::InvalidInput(format!(
                "dates must be strictly increasing: {} followed by {}",
                w[0], w[1]
            )));
        }
        Ok(())
    }
}

fn normalize(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn nan_is_normalized_to_none() {
        let frame = PairFrame::new(
            "KO",
            "PEP",
            vec![d(1), d(2)],
            vec![Some(f64::NAN), Some(1.0)],
            vec![Some(2.0), Some(2.0)],
        );
        assert_eq!(frame.price_y, vec![None, Some(1.0)]);
    }

    #[test]
    fn validate_accepts_well_formed_frame() {
        let frame = PairFrame::from_prices("KO", "PEP", vec![d(1), d(2)], &[1.0, 2.0], &[3.0, 4.0]);
        assert!(frame.validate().is_ok());
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn validate_rejects_duplicate_dates() {
        let frame = PairFrame::from_prices("KO", "PEP", vec![d(2), d(2)], &[1.0, 2.0], &[3.0, 4.0]);
        assert!(matches!(frame.validate(), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_length_mismatch() {
        let frame = PairFrame::from_prices("KO", "PEP", vec![d(1), d(2)], &[1.0, 2.0], &[3.0, 4.0])
            .with_zscore(vec![Some(0.0)]);
        let err = frame.validate().unwrap_err();
        assert!(err.to_string().contains("zscore"));
    }

    #[test]
    fn validate_rejects_same_ticker() {
        let frame = PairFrame::from_prices("KO", "KO", vec![d(1)], &[1.0], &[1.0]);
        assert!(frame.validate().is_err());
    }
}
