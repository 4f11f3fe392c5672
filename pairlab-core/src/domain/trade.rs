//! Trade — an immutable record of one executed order on one leg.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the pair an order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    Y,
    X,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Y => write!(f, "Y"),
            Leg::X => write!(f, "X"),
        }
    }
}

/// Executed order. Created once by the ledger, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    pub leg: Leg,
    /// Signed share quantity: positive buys, negative sells.
    pub quantity: f64,
    pub price: f64,
    /// `quantity * price`, signed like the quantity.
    pub notional: f64,
    pub fee: f64,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.quantity > 0.0
    }
}
