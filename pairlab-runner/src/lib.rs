//! PairLab Runner — run orchestration on top of `pairlab-core`.
//!
//! This crate provides:
//! - TOML run configuration with a content-addressed run id
//! - Wide price CSV ingestion, cleaning, pair selection and signal joins
//! - Seeded synthetic co-integrated pairs (tagged in results)
//! - Offline hedge-ratio report
//! - Paper-engine and vectorized runs, plus a parallel threshold sweep
//! - CSV/JSON export and artifact directories

pub mod config;
pub mod data_loader;
pub mod export;
pub mod hedge_report;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, PairSection, RunId};
pub use data_loader::{
    clean_prices, read_price_csv, read_signals_csv, CleanReport, LoadError, PriceTable,
    SignalTable, ZColumnPolicy,
};
pub use export::{load_artifacts, save_artifacts};
pub use hedge_report::{hedge_report, HedgeReport};
pub use runner::{
    prepare_data, run_backtest, run_backtest_from_data, run_paper, run_paper_from_data,
    BacktestResult, PaperResult, PreparedData, RunError,
};
pub use sweep::{run_sweep, SweepPoint};
pub use synthetic::{generate_pair, SyntheticParams};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn prepared_data_is_send_sync() {
        assert_send::<PreparedData>();
        assert_sync::<PreparedData>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<PaperResult>();
        assert_sync::<PaperResult>();
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<SweepPoint>();
        assert_sync::<SweepPoint>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
