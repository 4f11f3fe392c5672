//! Entry/exit threshold sweep.
//!
//! Every `(entry_z, exit_z)` combination in the grid is run through the
//! paper engine on one shared dataset, in parallel. Combinations that
//! violate `entry_z > exit_z >= 0` are skipped, not reported as failures.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pairlab_core::metrics::PerformanceStats;
use pairlab_core::signal::Thresholds;

use crate::config::{BacktestConfig, SweepSection};
use crate::runner::{run_paper_from_data, PreparedData, RunError};

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub entry_z: f64,
    pub exit_z: f64,
    pub stats: PerformanceStats,
    pub trades: usize,
    pub fees_paid: f64,
    pub final_equity: f64,
}

/// Threshold pairs to evaluate, in grid order.
pub fn grid_points(grid: &SweepSection) -> Vec<(f64, f64)> {
    grid.entry_z
        .iter()
        .flat_map(|&entry| grid.exit_z.iter().map(move |&exit| (entry, exit)))
        .filter(|&(entry, exit)| Thresholds::new(entry, exit).is_ok())
        .collect()
}

/// Run the sweep and rank results by Sharpe, best first.
///
/// Ties keep grid order.
pub fn run_sweep(
    config: &BacktestConfig,
    data: &PreparedData,
) -> Result<Vec<SweepPoint>, RunError> {
    let points = grid_points(&config.sweep);
    tracing::info!(points = points.len(), pair = %config.pair.label(), "starting sweep");

    let mut results = points
        .par_iter()
        .map(|&(entry_z, exit_z)| -> Result<SweepPoint, RunError> {
            let mut point_config = config.clone();
            point_config.engine.entry_z = entry_z;
            point_config.engine.exit_z = exit_z;
            let result = run_paper_from_data(&point_config, data)?;
            Ok(SweepPoint {
                entry_z,
                exit_z,
                stats: result.run.stats,
                trades: result.run.trades.len(),
                fees_paid: result.run.fees_paid,
                final_equity: result
                    .run
                    .final_equity()
                    .unwrap_or(config.engine.starting_cash),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    results.sort_by(|a, b| b.stats.sharpe.total_cmp(&a.stats.sharpe));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::ZColumnPolicy;
    use crate::runner::prepare_data;
    use chrono::NaiveDate;

    #[test]
    fn grid_skips_invalid_combinations() {
        let grid = SweepSection {
            entry_z: vec![1.0, 2.0],
            exit_z: vec![-0.5, 0.5, 1.0, 1.5],
        };
        assert_eq!(
            grid_points(&grid),
            vec![(1.0, 0.5), (2.0, 0.5), (2.0, 1.0), (2.0, 1.5)]
        );
    }

    #[test]
    fn grid_agrees_with_threshold_validation() {
        let grid = SweepSection {
            entry_z: vec![f64::NAN, 0.0, 2.0, f64::INFINITY],
            exit_z: vec![f64::NAN, 0.0, 2.0, -0.0],
        };
        let points = grid_points(&grid);
        for &entry in &grid.entry_z {
            for &exit in &grid.exit_z {
                let valid = Thresholds::new(entry, exit).is_ok();
                let listed = points
                    .iter()
                    .any(|&(e, x)| e.to_bits() == entry.to_bits() && x.to_bits() == exit.to_bits());
                assert_eq!(valid, listed, "entry={entry} exit={exit}");
            }
        }
        assert!(points.contains(&(2.0, 0.0)));
    }

    #[test]
    fn sweep_is_ranked_by_sharpe() {
        let mut config = BacktestConfig::for_pair("AAA", "BBB");
        config.data.synthetic = true;
        config.data.start = NaiveDate::from_ymd_opt(2019, 1, 1);
        config.data.end = NaiveDate::from_ymd_opt(2019, 12, 31);
        config.engine.window = 20;
        config.sweep = SweepSection {
            entry_z: vec![1.5, 2.0],
            exit_z: vec![0.0, 0.5, 2.0],
        };
        let data = prepare_data(&config, ZColumnPolicy::RollingOnly).unwrap();
        let results = run_sweep(&config, &data).unwrap();

        assert_eq!(results.len(), 4);
        assert!(results
            .windows(2)
            .all(|w| w[0].stats.sharpe >= w[1].stats.sharpe));
    }
}
