//! Notional sizing for a spread position.
//!
//! ```text
//! base            = risk_fraction * equity
//! z_scale         = min(z_scale_cap, |z| / max(entry_z, eps))
//! spread_notional = base * z_scale
//! unit            = spread_notional / (price_y + |beta| * price_x)
//! desired_y       =  target * unit
//! desired_x       = -target * beta * unit
//! ```

use crate::domain::SpreadPosition;
use crate::engine::config::EngineConfig;

/// Floor for the entry threshold in the z-scale denominator.
pub const SIZING_EPSILON: f64 = 1e-6;

/// Share quantities the engine wants to hold after a rebalance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadTarget {
    pub z_scale: f64,
    pub spread_notional: f64,
    pub unit: f64,
    pub desired_y: f64,
    pub desired_x: f64,
}

/// Size a spread position of direction `target` given current equity and prices.
pub fn size_spread(
    target: SpreadPosition,
    equity: f64,
    z: f64,
    price_y: f64,
    price_x: f64,
    beta: f64,
    config: &EngineConfig,
) -> SpreadTarget {
    let base_notional = config.risk_fraction * equity;
    let z_scale = (z.abs() / config.entry_z.max(SIZING_EPSILON)).min(config.z_scale_cap);
    let spread_notional = base_notional * z_scale;
    let unit = spread_notional / (price_y + beta.abs() * price_x);
    let sign = target.as_f64();

    SpreadTarget {
        z_scale,
        spread_notional,
        unit,
        desired_y: sign * unit,
        desired_x: -sign * beta * unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_spread_sells_y_buys_x() {
        let config = EngineConfig::default();
        // base 50_000, z_scale 2.5/2 = 1.25, notional 62_500, unit 62_500 / 160
        let s = size_spread(SpreadPosition::Short, 100_000.0, 2.5, 110.0, 50.0, 1.0, &config);
        assert_eq!(s.z_scale, 1.25);
        assert_eq!(s.spread_notional, 62_500.0);
        assert_eq!(s.unit, 390.625);
        assert_eq!(s.desired_y, -390.625);
        assert_eq!(s.desired_x, 390.625);
    }

    #[test]
    fn z_scale_is_capped() {
        let config = EngineConfig::default();
        let s = size_spread(SpreadPosition::Long, 100_000.0, -40.0, 100.0, 100.0, 0.5, &config);
        assert_eq!(s.z_scale, 2.0);
        // base 50_000 * 2 / (100 + 50)
        assert!((s.unit - 100_000.0 / 150.0).abs() < 1e-9);
        assert!(s.desired_y > 0.0);
        assert!(s.desired_x < 0.0);
        assert!((s.desired_x + 0.5 * s.unit).abs() < 1e-12);
    }

    #[test]
    fn custom_cap_respected() {
        let config = EngineConfig {
            z_scale_cap: 3.0,
            ..EngineConfig::default()
        };
        let s = size_spread(SpreadPosition::Long, 1_000.0, -10.0, 10.0, 10.0, 1.0, &config);
        assert_eq!(s.z_scale, 3.0);
    }

    #[test]
    fn negative_beta_hedges_with_same_sign() {
        let config = EngineConfig::default();
        let s = size_spread(SpreadPosition::Long, 10_000.0, -2.0, 10.0, 10.0, -1.0, &config);
        assert!(s.desired_y > 0.0);
        assert!(s.desired_x > 0.0);
    }

    #[test]
    fn flat_target_wants_nothing() {
        let config = EngineConfig::default();
        let s = size_spread(SpreadPosition::Flat, 10_000.0, 0.1, 10.0, 10.0, 1.0, &config);
        assert_eq!(s.desired_y, 0.0);
        assert_eq!(s.desired_x, 0.0);
    }
}
