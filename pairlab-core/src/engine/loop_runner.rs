//! Step-by-step paper-trading loop.
//!
//! The run is a `try_fold` over the frame's dates. The accumulator carries the
//! ledger and the current spread position; nothing else survives between
//! steps. Any error aborts the fold, so a failed run yields no output at all.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::{Leg, PairFrame, SpreadPosition};
use crate::engine::config::EngineConfig;
use crate::engine::sizing::size_spread;
use crate::engine::state::{PaperRun, StepRecord};
use crate::error::{SimError, SimResult};
use crate::estimator::{fit_ols, OlsFit};
use crate::ledger::Ledger;
use crate::metrics::{simple_returns, PerformanceStats};
use crate::signal::{next_position, Thresholds};
use crate::spread::{resolve_zscore, ZScoreSeries};

/// Deltas at or below this many shares are not submitted.
pub const MIN_TRADE_QUANTITY: f64 = 1e-6;

/// Paper-trading engine bound to one pair frame and one configuration.
#[derive(Debug, Clone)]
pub struct Engine<'a> {
    frame: &'a PairFrame,
    config: EngineConfig,
    beta: f64,
    hedge_fit: Option<OlsFit>,
}

impl<'a> Engine<'a> {
    /// Validate inputs and estimate the hedge ratio by OLS over the full history.
    pub fn new(frame: &'a PairFrame, config: EngineConfig) -> SimResult<Self> {
        config.validate()?;
        frame.validate()?;
        let fit = fit_ols(&frame.price_y, &frame.price_x)?;
        Ok(Self {
            frame,
            config,
            beta: fit.beta,
            hedge_fit: Some(fit),
        })
    }

    /// Validate inputs and use a caller-supplied hedge ratio.
    pub fn with_hedge_ratio(
        frame: &'a PairFrame,
        config: EngineConfig,
        beta: f64,
    ) -> SimResult<Self> {
        config.validate()?;
        frame.validate()?;
        if !beta.is_finite() {
            return Err(SimError::Configuration(format!(
                "hedge ratio must be finite, got {beta}"
            )));
        }
        Ok(Self {
            frame,
            config,
            beta,
            hedge_fit: None,
        })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// The OLS fit, when the hedge ratio was estimated rather than supplied.
    pub fn hedge_fit(&self) -> Option<&OlsFit> {
        self.hedge_fit.as_ref()
    }

    /// The z-score series this engine will trade on.
    pub fn zscores(&self) -> ZScoreSeries {
        resolve_zscore(self.frame, self.beta, self.config.window)
    }

    /// Run the simulation over the whole frame.
    pub fn run(&self) -> SimResult<PaperRun> {
        let zscores = self.zscores();
        let thresholds = self.config.thresholds();
        let ledger = Ledger::new(self.config.starting_cash, self.config.fee_rate);
        let rows = Vec::with_capacity(self.frame.len());

        let (ledger, _position, mut rows) = self.frame.dates.iter().enumerate().try_fold(
            (ledger, SpreadPosition::Flat, rows),
            |(mut ledger, position, mut rows), (t, &date)| {
                let z = zscores.values[t];
                let (position, record) =
                    self.step(&mut ledger, position, &thresholds, t, date, z)?;
                rows.push(record);
                Ok::<_, SimError>((ledger, position, rows))
            },
        )?;

        let equity: Vec<f64> = rows.iter().map(|r| r.equity).collect();
        for (row, ret) in rows.iter_mut().zip(simple_returns(&equity)) {
            row.ret = ret;
        }
        let returns: Vec<Option<f64>> = rows.iter().map(|r| r.ret).collect();
        let stats = PerformanceStats::compute(&returns);

        tracing::debug!(
            pair = %format!("{}/{}", self.frame.y_ticker, self.frame.x_ticker),
            beta = self.beta,
            steps = rows.len(),
            trades = ledger.trades().len(),
            fees = ledger.fees_paid(),
            "paper run complete"
        );

        Ok(PaperRun {
            y_ticker: self.frame.y_ticker.clone(),
            x_ticker: self.frame.x_ticker.clone(),
            beta: self.beta,
            zscore_source: zscores.source,
            fees_paid: ledger.fees_paid(),
            final_cash: ledger.cash(),
            trades: ledger.into_trades(),
            rows,
            stats,
        })
    }

    /// One step: validate prices, advance the signal, rebalance if needed, mark.
    fn step(
        &self,
        ledger: &mut Ledger,
        position: SpreadPosition,
        thresholds: &Thresholds,
        t: usize,
        date: NaiveDate,
        z: Option<f64>,
    ) -> SimResult<(SpreadPosition, StepRecord)> {
        let price_y = self.leg_price(t, date, Leg::Y)?;
        let price_x = self.leg_price(t, date, Leg::X)?;
        let marks = self.marks(price_y, price_x);

        let target = next_position(position, z, thresholds);
        if target != position {
            self.rebalance(ledger, &marks, date, target, z, price_y, price_x)?;
        }

        let record = StepRecord {
            date,
            price_y,
            price_x,
            zscore: z,
            signal: target,
            pos_y: ledger.position(&self.frame.y_ticker),
            pos_x: ledger.position(&self.frame.x_ticker),
            equity: ledger.portfolio_value(&marks),
            ret: None,
        };
        Ok((target, record))
    }

    #[allow(clippy::too_many_arguments)]
    fn rebalance(
        &self,
        ledger: &mut Ledger,
        marks: &HashMap<String, f64>,
        date: NaiveDate,
        target: SpreadPosition,
        z: Option<f64>,
        price_y: f64,
        price_x: f64,
    ) -> SimResult<()> {
        let equity = ledger.portfolio_value(marks);
        let sized = size_spread(
            target,
            equity,
            z.unwrap_or(0.0),
            price_y,
            price_x,
            self.beta,
            &self.config,
        );

        let legs = [
            (Leg::Y, &self.frame.y_ticker, sized.desired_y, price_y),
            (Leg::X, &self.frame.x_ticker, sized.desired_x, price_x),
        ];
        for (leg, ticker, desired, price) in legs {
            let delta = desired - ledger.position(ticker);
            if delta.abs() > MIN_TRADE_QUANTITY {
                let trade = ledger.execute(date, ticker, delta, price, leg)?;
                tracing::debug!(
                    %date,
                    ticker = %trade.ticker,
                    leg = %trade.leg,
                    quantity = trade.quantity,
                    price = trade.price,
                    fee = trade.fee,
                    "executed"
                );
            }
        }
        Ok(())
    }

    fn leg_price(&self, t: usize, date: NaiveDate, leg: Leg) -> SimResult<f64> {
        let (column, ticker) = match leg {
            Leg::Y => (&self.frame.price_y, &self.frame.y_ticker),
            Leg::X => (&self.frame.price_x, &self.frame.x_ticker),
        };
        match column[t] {
            Some(p) if p.is_finite() && p > 0.0 => Ok(p),
            Some(p) if p.is_finite() => Err(SimError::InvalidPrice {
                ticker: ticker.clone(),
                price: p,
            }),
            _ => Err(SimError::MissingPrice { date, leg }),
        }
    }

    fn marks(&self, price_y: f64, price_x: f64) -> HashMap<String, f64> {
        HashMap::from([
            (self.frame.y_ticker.clone(), price_y),
            (self.frame.x_ticker.clone(), price_x),
        ])
    }
}
