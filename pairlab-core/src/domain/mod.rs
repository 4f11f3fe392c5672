//! Domain types for PairLab

pub mod frame;
pub mod position;
pub mod trade;

pub use frame::PairFrame;
pub use position::SpreadPosition;
pub use trade::{Leg, Trade};
