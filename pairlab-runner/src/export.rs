//! Reporting and export — JSON manifests and CSV tables.
//!
//! CSV outputs:
//! - **paper results**: `date,<Y>,<X>,zscore,signal,pos_y,pos_x,equity,ret`
//! - **trades**: the ledger's execution log
//! - **hedge report**: `date,<Y>,<X>,spread,zscore_full` (usable as a signal file)
//! - **backtest**: `date,position,strategy_return,equity_curve`
//! - **sweep**: one row per threshold pair
//! - **clean prices**: the wide table after cleaning
//!
//! Missing values are written as empty cells. Persisted JSON carries a
//! `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use pairlab_core::domain::Trade;
use pairlab_core::engine::PaperRun;

use crate::data_loader::PriceTable;
use crate::hedge_report::HedgeReport;
use crate::runner::{BacktestResult, PaperResult, SCHEMA_VERSION};
use crate::sweep::SweepPoint;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PaperResult` to pretty JSON.
pub fn export_json(result: &PaperResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PaperResult to JSON")
}

/// Deserialize a `PaperResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PaperResult> {
    let result: PaperResult =
        serde_json::from_str(json).context("failed to deserialize PaperResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Per-step paper results. `signal` is +1 (long spread), 0 or -1.
pub fn export_paper_csv(run: &PaperRun) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        run.y_ticker.as_str(),
        run.x_ticker.as_str(),
        "zscore",
        "signal",
        "pos_y",
        "pos_x",
        "equity",
        "ret",
    ])?;
    for row in &run.rows {
        wtr.write_record([
            row.date.to_string(),
            row.price_y.to_string(),
            row.price_x.to_string(),
            opt(row.zscore),
            row.signal.sign().to_string(),
            row.pos_y.to_string(),
            row.pos_x.to_string(),
            row.equity.to_string(),
            opt(row.ret),
        ])?;
    }
    finish(wtr)
}

/// Execution log, one row per leg fill.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "leg", "ticker", "quantity", "price", "notional", "fee"])?;
    for t in trades {
        wtr.write_record([
            t.date.to_string(),
            t.leg.to_string(),
            t.ticker.clone(),
            t.quantity.to_string(),
            t.price.to_string(),
            t.notional.to_string(),
            t.fee.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_hedge_csv(report: &HedgeReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        report.y_ticker.as_str(),
        report.x_ticker.as_str(),
        "spread",
        "zscore_full",
    ])?;
    for row in &report.rows {
        wtr.write_record([
            row.date.to_string(),
            row.price_y.to_string(),
            row.price_x.to_string(),
            row.spread.to_string(),
            row.zscore_full.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_backtest_csv(result: &BacktestResult) -> Result<String> {
    let run = &result.run;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "position", "strategy_return", "equity_curve"])?;
    for (t, date) in result.dates.iter().enumerate() {
        wtr.write_record([
            date.to_string(),
            run.positions[t].sign().to_string(),
            opt(run.strategy_returns[t]),
            run.equity_curve[t].to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_sweep_csv(points: &[SweepPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_z",
        "exit_z",
        "sharpe",
        "total_return",
        "annual_return",
        "annual_vol",
        "max_drawdown",
        "num_days",
        "trades",
        "fees_paid",
        "final_equity",
    ])?;
    for p in points {
        wtr.write_record([
            p.entry_z.to_string(),
            p.exit_z.to_string(),
            format!("{:.4}", p.stats.sharpe),
            format!("{:.6}", p.stats.total_return),
            format!("{:.6}", p.stats.annual_return),
            format!("{:.6}", p.stats.annual_vol),
            format!("{:.6}", p.stats.max_drawdown),
            p.stats.num_days.to_string(),
            p.trades.to_string(),
            format!("{:.2}", p.fees_paid),
            format!("{:.2}", p.final_equity),
        ])?;
    }
    finish(wtr)
}

/// The wide price table, header `date,<TICKER>...`.
pub fn export_prices_csv(table: &PriceTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date".to_string()];
    header.extend(table.tickers.iter().cloned());
    wtr.write_record(&header)?;
    for (date, row) in table.dates.iter().zip(&table.rows) {
        let mut record = vec![date.to_string()];
        record.extend(row.iter().map(|v| opt(*v)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a paper run.
///
/// Creates `paper_{pair}_{run_id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `PaperResult`
/// - `paper_results.csv`: per-step table
/// - `trades.csv`: execution log
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &PaperResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("paper_{}_{}", result.pair, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write(&run_dir.join("paper_results.csv"), &export_paper_csv(&result.run)?)?;
    write(&run_dir.join("trades.csv"), &export_trades_csv(&result.run.trades)?)?;

    Ok(run_dir)
}

/// Load a `PaperResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<PaperResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pairlab_core::domain::{Leg, SpreadPosition};
    use pairlab_core::engine::StepRecord;
    use pairlab_core::engine::EngineConfig;
    use pairlab_core::metrics::PerformanceStats;
    use pairlab_core::spread::ZScoreSource;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_result() -> PaperResult {
        let rows = vec![
            StepRecord {
                date: d(2),
                price_y: 100.0,
                price_x: 50.0,
                zscore: None,
                signal: SpreadPosition::Flat,
                pos_y: 0.0,
                pos_x: 0.0,
                equity: 100_000.0,
                ret: None,
            },
            StepRecord {
                date: d(3),
                price_y: 101.0,
                price_x: 50.5,
                zscore: Some(2.5),
                signal: SpreadPosition::Short,
                pos_y: -10.0,
                pos_x: 10.0,
                equity: 99_999.5,
                ret: Some(-0.000005),
            },
        ];
        let trades = vec![Trade {
            date: d(3),
            ticker: "KO".into(),
            leg: Leg::Y,
            quantity: -10.0,
            price: 101.0,
            notional: -1010.0,
            fee: 0.202,
        }];
        PaperResult {
            schema_version: SCHEMA_VERSION,
            run_id: "ab".repeat(32),
            pair: "KO_PEP".into(),
            start_date: Some(d(2)),
            end_date: Some(d(3)),
            dataset_hash: "hash".into(),
            has_synthetic: false,
            engine: EngineConfig::default(),
            hedge_fit: None,
            zscore_column: Some("zscore".into()),
            run: PaperRun {
                y_ticker: "KO".into(),
                x_ticker: "PEP".into(),
                beta: 1.0,
                zscore_source: ZScoreSource::Supplied,
                rows,
                trades,
                fees_paid: 0.202,
                final_cash: 101_009.798,
                stats: PerformanceStats::default(),
            },
        }
    }

    #[test]
    fn paper_csv_layout() {
        let csv = export_paper_csv(&sample_result().run).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,KO,PEP,zscore,signal,pos_y,pos_x,equity,ret");
        assert_eq!(lines[1], "2024-01-02,100,50,,0,0,0,100000,");
        assert_eq!(lines[2], "2024-01-03,101,50.5,2.5,-1,-10,10,99999.5,-0.000005");
    }

    #[test]
    fn trades_csv_layout() {
        let csv = export_trades_csv(&sample_result().run.trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,leg,ticker,quantity,price,notional,fee");
        assert_eq!(lines[1], "2024-01-03,Y,KO,-10,101,-1010,0.202");
    }

    #[test]
    fn json_round_trip_and_version_gate() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        assert_eq!(import_json(&json).unwrap(), result);

        let mut future = result.clone();
        future.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&future).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn artifacts_written_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();
        assert!(run_dir.ends_with("paper_KO_PEP_abababababab"));
        for name in ["manifest.json", "paper_results.csv", "trades.csv"] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
        assert_eq!(load_artifacts(&run_dir).unwrap(), result);
    }

    #[test]
    fn prices_csv_writes_missing_as_empty() {
        let table = PriceTable {
            tickers: vec!["A".into(), "B".into()],
            dates: vec![d(2)],
            rows: vec![vec![Some(1.5), None]],
        };
        assert_eq!(export_prices_csv(&table).unwrap(), "date,A,B\n2024-01-02,1.5,\n");
    }
}
