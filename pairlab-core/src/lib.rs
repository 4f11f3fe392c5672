//! PairLab Core — pairs-trading simulation: hedge ratio, spread signal, ledger, engine.
//!
//! This crate contains the heart of the paper-trading simulator:
//! - Domain types (pair frame, spread position, trade records)
//! - OLS hedge-ratio estimator
//! - Spread and z-score generation (pass-through or rolling)
//! - Z-score entry/exit state machine
//! - Ledger with proportional turnover fees
//! - Step-by-step engine folded over the time index
//! - Performance statistics and a return-based vectorized backtest
//!
//! No I/O happens here; loading, configuration files and export live in
//! `pairlab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod ledger;
pub mod metrics;
pub mod signal;
pub mod spread;
pub mod vectorized;

pub use domain::{Leg, PairFrame, SpreadPosition, Trade};
pub use engine::{Engine, EngineConfig, PaperRun, StepRecord};
pub use error::{SimError, SimResult};
pub use estimator::{fit_ols, OlsFit};
pub use ledger::Ledger;
pub use metrics::PerformanceStats;
pub use signal::{next_position, positions_for, Thresholds};
pub use spread::{resolve_zscore, rolling_zscore, spread_series, ZScoreSeries, ZScoreSource};
pub use vectorized::{run_vectorized, VectorizedRun};
