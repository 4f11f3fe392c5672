//! Per-step output rows and the complete run result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{SpreadPosition, Trade};
use crate::metrics::PerformanceStats;
use crate::spread::ZScoreSource;

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub date: NaiveDate,
    pub price_y: f64,
    pub price_x: f64,
    pub zscore: Option<f64>,
    /// Position held after this step's rebalance.
    pub signal: SpreadPosition,
    pub pos_y: f64,
    pub pos_x: f64,
    /// Post-trade portfolio value.
    pub equity: f64,
    /// Simple return versus the previous step; `None` on the first step.
    pub ret: Option<f64>,
}

/// Everything a paper-trading run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRun {
    pub y_ticker: String,
    pub x_ticker: String,
    pub beta: f64,
    pub zscore_source: ZScoreSource,
    pub rows: Vec<StepRecord>,
    pub trades: Vec<Trade>,
    pub fees_paid: f64,
    pub final_cash: f64,
    pub stats: PerformanceStats,
}

impl PaperRun {
    pub fn equity_curve(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.equity).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.rows.last().map(|r| r.equity)
    }

    /// Number of position changes over the run.
    pub fn position_changes(&self) -> usize {
        let mut prev = SpreadPosition::Flat;
        let mut changes = 0;
        for row in &self.rows {
            if row.signal != prev {
                changes += 1;
                prev = row.signal;
            }
        }
        changes
    }
}
