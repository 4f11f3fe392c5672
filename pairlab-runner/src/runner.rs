//! Run orchestration: resolve inputs from a config, then simulate.
//!
//! Two kinds of run:
//! - `run_paper()`: the step-by-step engine with a ledger. Used by `paper`.
//! - `run_backtest()`: the return-based vectorized backtest. Used by `backtest`.
//!
//! Both have a `*_from_data()` variant that takes already-prepared inputs and
//! does no I/O; the sweep uses those to share one loaded dataset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::domain::PairFrame;
use pairlab_core::engine::{Engine, EngineConfig, PaperRun};
use pairlab_core::error::SimError;
use pairlab_core::estimator::OlsFit;
use pairlab_core::vectorized::{run_vectorized, VectorizedRun};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{
    clean_prices, dataset_hash, join_signals, read_price_csv, read_signals_csv, CleanReport,
    LoadError, ZColumnPolicy,
};
use crate::synthetic::{generate_pair, SyntheticParams};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Synthetic data covers this range when the config gives no dates.
const SYNTHETIC_START: (i32, u32, u32) = (2015, 1, 1);
const SYNTHETIC_END: (i32, u32, u32) = (2019, 12, 31);

/// A pair frame ready for simulation, with its provenance.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub frame: PairFrame,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Present when prices went through the cleaning pass.
    pub clean_report: Option<CleanReport>,
    /// Name of the precomputed z-score column, if one was joined.
    pub zscore_column: Option<String>,
}

/// Load, clean, select and join the inputs a config describes.
pub fn prepare_data(
    config: &BacktestConfig,
    policy: ZColumnPolicy,
) -> Result<PreparedData, RunError> {
    let (y, x) = (config.pair.y.as_str(), config.pair.x.as_str());

    let (raw, has_synthetic) = match &config.data.prices {
        Some(path) => (read_price_csv(path)?, false),
        None => {
            let start = config.data.start.unwrap_or_else(|| ymd(SYNTHETIC_START));
            let end = config.data.end.unwrap_or_else(|| ymd(SYNTHETIC_END));
            (generate_pair(y, x, start, end, &SyntheticParams::default()), true)
        }
    };

    let windowed = raw.between(config.data.start, config.data.end);
    let (clean, report) = clean_prices(&windowed);
    let mut frame = clean.select_pair(y, x)?;

    let mut zscore_column = None;
    if let Some(path) = &config.data.signals {
        let signals = read_signals_csv(path, policy)?;
        zscore_column = signals.zscore_column.clone();
        frame = join_signals(&frame, &signals)?;
    }

    if frame.is_empty() {
        return Err(LoadError::Empty(format!("{y}/{x}")).into());
    }

    Ok(PreparedData {
        dataset_hash: dataset_hash(&frame),
        frame,
        has_synthetic,
        clean_report: Some(report),
        zscore_column,
    })
}

fn ymd((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

// ─── Paper run ──────────────────────────────────────────────────────

/// Complete result of a paper-trading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub pair: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub engine: EngineConfig,
    /// Present when beta was estimated rather than configured.
    pub hedge_fit: Option<OlsFit>,
    pub zscore_column: Option<String>,
    pub run: PaperRun,
}

/// Run the paper engine for a config (loads data).
pub fn run_paper(config: &BacktestConfig) -> Result<PaperResult, RunError> {
    config.validate()?;
    let data = prepare_data(config, ZColumnPolicy::RollingOnly)?;
    run_paper_from_data(config, &data)
}

/// Run the paper engine on prepared data. No I/O.
pub fn run_paper_from_data(
    config: &BacktestConfig,
    data: &PreparedData,
) -> Result<PaperResult, RunError> {
    let engine = match config.data.hedge_ratio {
        Some(beta) => Engine::with_hedge_ratio(&data.frame, config.engine.clone(), beta)?,
        None => Engine::new(&data.frame, config.engine.clone())?,
    };
    let hedge_fit = engine.hedge_fit().copied();
    let run = engine.run()?;

    tracing::info!(
        pair = %config.pair.label(),
        beta = run.beta,
        days = run.stats.num_days,
        trades = run.trades.len(),
        total_return = run.stats.total_return,
        sharpe = run.stats.sharpe,
        "paper run finished"
    );

    Ok(PaperResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        pair: config.pair.label(),
        start_date: data.frame.dates.first().copied(),
        end_date: data.frame.dates.last().copied(),
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
        engine: config.engine.clone(),
        hedge_fit,
        zscore_column: data.zscore_column.clone(),
        run,
    })
}

// ─── Vectorized backtest ────────────────────────────────────────────

/// Complete result of a return-based backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub pair: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub engine: EngineConfig,
    pub zscore_column: Option<String>,
    pub dates: Vec<NaiveDate>,
    pub run: VectorizedRun,
}

/// Run the vectorized backtest for a config (loads data).
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = prepare_data(config, ZColumnPolicy::AllowFullSample)?;
    run_backtest_from_data(config, &data)
}

/// Run the vectorized backtest on prepared data. No I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    data: &PreparedData,
) -> Result<BacktestResult, RunError> {
    let run = run_vectorized(&data.frame, &config.engine, config.data.hedge_ratio)?;

    tracing::info!(
        pair = %config.pair.label(),
        beta = run.beta,
        days = run.stats.num_days,
        total_return = run.stats.total_return,
        sharpe = run.stats.sharpe,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        pair: config.pair.label(),
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
        engine: config.engine.clone(),
        zscore_column: data.zscore_column.clone(),
        dates: data.frame.dates.clone(),
        run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_config() -> BacktestConfig {
        let mut config = BacktestConfig::for_pair("AAA", "BBB");
        config.data.synthetic = true;
        config.data.start = NaiveDate::from_ymd_opt(2018, 1, 1);
        config.data.end = NaiveDate::from_ymd_opt(2019, 12, 31);
        config.engine.window = 20;
        config
    }

    #[test]
    fn paper_run_on_synthetic_data_is_tagged() {
        let result = run_paper(&synthetic_config()).unwrap();
        assert!(result.has_synthetic);
        assert_eq!(result.pair, "AAA_BBB");
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert!(result.hedge_fit.is_some());
        assert_eq!(result.run.rows.len(), 522);
        assert_eq!(result.start_date, NaiveDate::from_ymd_opt(2018, 1, 1));
        assert!(!result.run.trades.is_empty());
    }

    #[test]
    fn fixed_hedge_ratio_skips_fit() {
        let mut config = synthetic_config();
        config.data.hedge_ratio = Some(1.5);
        let result = run_paper(&config).unwrap();
        assert!(result.hedge_fit.is_none());
        assert_eq!(result.run.beta, 1.5);
    }

    #[test]
    fn backtest_and_paper_share_dataset_hash() {
        let config = synthetic_config();
        let data = prepare_data(&config, ZColumnPolicy::AllowFullSample).unwrap();
        let paper = run_paper_from_data(&config, &data).unwrap();
        let backtest = run_backtest_from_data(&config, &data).unwrap();
        assert_eq!(paper.dataset_hash, backtest.dataset_hash);
        assert_eq!(paper.run_id, backtest.run_id);
        assert_eq!(backtest.dates.len(), backtest.run.positions.len());
    }

    #[test]
    fn invalid_config_is_config_error() {
        let mut config = synthetic_config();
        config.engine.exit_z = 5.0;
        assert!(matches!(run_paper(&config), Err(RunError::Config(_))));
    }

    #[test]
    fn missing_price_file_is_data_error() {
        let mut config = synthetic_config();
        config.data.prices = Some("/nonexistent/prices.csv".into());
        assert!(matches!(
            run_paper(&config),
            Err(RunError::Data(LoadError::Io { .. }))
        ));
    }
}
