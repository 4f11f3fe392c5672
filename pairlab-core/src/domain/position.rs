//! SpreadPosition — the discrete state carried by the signal state machine.

use serde::{Deserialize, Serialize};

/// Direction of the spread position.
///
/// Long spread buys Y and sells beta units of X; short spread does the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadPosition {
    Long,
    #[default]
    Flat,
    Short,
}

impl SpreadPosition {
    /// Signed multiplier used by the sizing formula: +1, 0 or -1.
    pub fn sign(self) -> i8 {
        match self {
            SpreadPosition::Long => 1,
            SpreadPosition::Flat => 0,
            SpreadPosition::Short => -1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.sign())
    }

    pub fn is_flat(self) -> bool {
        self == SpreadPosition::Flat
    }
}
