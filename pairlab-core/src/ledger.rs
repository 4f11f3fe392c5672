//! Ledger — paper broker holding cash, per-ticker shares, fees and the trade log.
//!
//! Accounting identity after every execution:
//! `cash_after == cash_before - notional - fee` with `fee == |notional| * fee_rate`.
//!
//! Valuation excludes any ticker that has no entry in the supplied price map.
//! A held leg with a missing quote therefore contributes nothing (it is not
//! carried at its last price and not forced to zero). Callers that need a
//! full mark must supply every held ticker.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Leg, Trade};
use crate::error::{SimError, SimResult};

/// Default proportional turnover fee (2 bps).
pub const DEFAULT_FEE_RATE: f64 = 0.0002;

/// Cash + holdings + append-only trade log for one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    fee_rate: f64,
    holdings: BTreeMap<String, f64>,
    trades: Vec<Trade>,
    fees_paid: f64,
}

impl Ledger {
    pub fn new(starting_cash: f64, fee_rate: f64) -> Self {
        Self {
            cash: starting_cash,
            fee_rate,
            holdings: BTreeMap::new(),
            trades: Vec::new(),
            fees_paid: 0.0,
        }
    }

    /// Execute a signed quantity at `price`, charging the turnover fee.
    ///
    /// Returns the recorded trade.
    pub fn execute(
        &mut self,
        date: NaiveDate,
        ticker: &str,
        quantity: f64,
        price: f64,
        leg: Leg,
    ) -> SimResult<&Trade> {
        if !price.is_finite() || price <= 0.0 {
            return Err(SimError::InvalidPrice {
                ticker: ticker.to_string(),
                price,
            });
        }

        let notional = quantity * price;
        let fee = notional.abs() * self.fee_rate;

        *self.holdings.entry(ticker.to_string()).or_insert(0.0) += quantity;
        self.cash -= notional;
        self.cash -= fee;
        self.fees_paid += fee;

        let index = self.trades.len();
        self.trades.push(Trade {
            date,
            ticker: ticker.to_string(),
            leg,
            quantity,
            price,
            notional,
            fee,
        });
        Ok(&self.trades[index])
    }

    /// Signed share quantity held (zero if never traded).
    pub fn position(&self, ticker: &str) -> f64 {
        self.holdings.get(ticker).copied().unwrap_or(0.0)
    }

    /// Cash plus the marked value of every holding that has a price in `prices`.
    pub fn portfolio_value(&self, prices: &HashMap<String, f64>) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .iter()
            .filter_map(|(ticker, qty)| prices.get(ticker).map(|p| qty * p))
            .sum();
        self.cash + holdings_value
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Consume the ledger, yielding its trade log.
    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}
