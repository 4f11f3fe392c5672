//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::ledger::DEFAULT_FEE_RATE;
use crate::signal::Thresholds;

/// Parameters for one paper-trading run.
///
/// Passed into the engine at construction; never global, so several
/// configurations can run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_cash: f64,
    /// Rolling window for the computed z-score.
    pub window: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    /// Fraction of equity committed to a spread position, in (0, 1].
    pub risk_fraction: f64,
    /// Proportional fee charged on the absolute notional of every execution.
    pub fee_rate: f64,
    /// Upper bound on the `|z| / entry_z` sizing multiplier.
    pub z_scale_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            window: 60,
            entry_z: 2.0,
            exit_z: 0.5,
            risk_fraction: 0.5,
            fee_rate: DEFAULT_FEE_RATE,
            z_scale_cap: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            entry_z: self.entry_z,
            exit_z: self.exit_z,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        self.thresholds().validate()?;

        if !self.starting_cash.is_finite() || self.starting_cash <= 0.0 {
            return Err(SimError::Configuration(format!(
                "starting_cash must be positive, got {}",
                self.starting_cash
            )));
        }
        if self.window < 2 {
            return Err(SimError::Configuration(format!(
                "window must be >= 2, got {}",
                self.window
            )));
        }
        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(SimError::Configuration(format!(
                "risk_fraction must be in (0, 1], got {}",
                self.risk_fraction
            )));
        }
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(SimError::Configuration(format!(
                "fee_rate must be >= 0, got {}",
                self.fee_rate
            )));
        }
        if !self.z_scale_cap.is_finite() || self.z_scale_cap <= 0.0 {
            return Err(SimError::Configuration(format!(
                "z_scale_cap must be positive, got {}",
                self.z_scale_cap
            )));
        }
        Ok(())
    }
}
