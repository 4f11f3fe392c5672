//! Error taxonomy for the simulation core.
//!
//! Every variant is fatal for the run that raised it: the engine never emits a
//! partial result. Missing z-scores are not errors (they hold the signal state).

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Leg;

/// Errors raised by the estimator, the ledger, and the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("insufficient data: need at least {needed} paired observations, found {found}")]
    InsufficientData { needed: usize, found: usize },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("missing {leg} price on {date}")]
    MissingPrice { date: NaiveDate, leg: Leg },

    #[error("invalid price {price} for {ticker}: prices must be finite and positive")]
    InvalidPrice { ticker: String, price: f64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_message_names_leg_and_date() {
        let err = SimError::MissingPrice {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            leg: Leg::X,
        };
        assert_eq!(err.to_string(), "missing X price on 2024-03-01");
    }

    #[test]
    fn insufficient_data_message() {
        let err = SimError::InsufficientData { needed: 2, found: 1 };
        assert!(err.to_string().contains("found 1"));
    }
}
