//! Z-score → target position state machine.
//!
//! Three states (Long, Flat, Short), no terminal state. Evaluated once per
//! step against the previous state:
//!
//! | condition              | target  |
//! |------------------------|---------|
//! | `z > entry_z`          | Short   |
//! | `z < -entry_z`         | Long    |
//! | `|z| < exit_z`         | Flat    |
//! | otherwise              | hold    |
//! | `z` missing            | hold    |

use serde::{Deserialize, Serialize};

use crate::domain::SpreadPosition;
use crate::error::{SimError, SimResult};

/// Entry/exit band for the state machine. Invariant: `entry_z > exit_z >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub entry_z: f64,
    pub exit_z: f64,
}

impl Thresholds {
    pub fn new(entry_z: f64, exit_z: f64) -> SimResult<Self> {
        let t = Self { entry_z, exit_z };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.entry_z.is_finite() || !self.exit_z.is_finite() {
            return Err(SimError::Configuration(
                "entry_z and exit_z must be finite".into(),
            ));
        }
        if self.exit_z < 0.0 {
            return Err(SimError::Configuration(format!(
                "exit_z must be >= 0, got {}",
                self.exit_z
            )));
        }
        if self.exit_z >= self.entry_z {
            return Err(SimError::Configuration(format!(
                "exit_z ({}) must be < entry_z ({})",
                self.exit_z, self.entry_z
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entry_z: 2.0,
            exit_z: 0.5,
        }
    }
}

/// One transition of the state machine.
pub fn next_position(
    current: SpreadPosition,
    z: Option<f64>,
    thresholds: &Thresholds,
) -> SpreadPosition {
    let Some(z) = z.filter(|v| !v.is_nan()) else {
        return current;
    };
    if z > thresholds.entry_z {
        SpreadPosition::Short
    } else if z < -thresholds.entry_z {
        SpreadPosition::Long
    } else if z.abs() < thresholds.exit_z {
        SpreadPosition::Flat
    } else {
        current
    }
}

/// Fold the state machine over a z-score sequence, starting Flat.
///
/// Returns the position held after each step.
pub fn positions_for(zscores: &[Option<f64>], thresholds: &Thresholds) -> Vec<SpreadPosition> {
    zscores
        .iter()
        .scan(SpreadPosition::Flat, |state, &z| {
            *state = next_position(*state, z, thresholds);
            Some(*state)
        })
        .collect()
}
