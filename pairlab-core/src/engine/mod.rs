//! Paper-trading engine — drives the signal state machine and the ledger
//! through time.
//!
//! Per step, in date order:
//!
//! 1. Validate both leg prices
//! 2. Advance the state machine on the step's z-score
//! 3. On a position change: size the spread, execute Y then X deltas
//! 4. Record post-trade equity and position
//!
//! The loop is a fold over the steps threading `(Ledger, SpreadPosition)`.

pub mod config;
pub mod loop_runner;
pub mod sizing;
pub mod state;

pub use config::EngineConfig;
pub use loop_runner::Engine;
pub use sizing::{size_spread, SpreadTarget};
pub use state::{PaperRun, StepRecord};
