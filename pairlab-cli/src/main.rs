//! PairLab CLI — pairs-trading research and paper-trading commands.
//!
//! Commands:
//! - `clean`: sort, dedupe and drop bad rows from a wide price CSV
//! - `hedge`: OLS hedge ratio and full-sample spread z-score for a pair
//! - `paper`: step-by-step paper trading with a ledger
//! - `backtest`: return-based vectorized backtest
//! - `sweep`: parallel entry/exit threshold grid, ranked by Sharpe

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use pairlab_core::metrics::PerformanceStats;
use pairlab_runner::config::{BacktestConfig, PairSection};
use pairlab_runner::data_loader::{clean_prices, read_price_csv, ZColumnPolicy};
use pairlab_runner::export::{
    export_backtest_csv, export_hedge_csv, export_prices_csv, export_sweep_csv, write,
};
use pairlab_runner::hedge_report::{hedge_report, HedgeReport};
use pairlab_runner::runner::{prepare_data, run_backtest, run_paper, BacktestResult, PaperResult};
use pairlab_runner::save_artifacts;
use pairlab_runner::sweep::{run_sweep, SweepPoint};

#[derive(Parser)]
#[command(
    name = "pairlab",
    about = "PairLab CLI: statistical-arbitrage pairs trading simulator"
)]
struct Cli {
    /// Log run summaries (info level).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Log every execution (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a wide price CSV (date,<TICKER>...).
    Clean {
        /// Raw price CSV.
        #[arg(long)]
        prices: PathBuf,

        /// Where to write the cleaned CSV.
        #[arg(long, default_value = "output/adj_close_clean.csv")]
        out: PathBuf,
    },
    /// Estimate the hedge ratio and write the spread/z-score table.
    Hedge {
        #[command(flatten)]
        run: RunArgs,

        /// Output CSV. Defaults to <output_dir>/hedge_results_<Y>_<X>.csv.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Paper-trade the pair through the step-by-step engine.
    Paper {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run the return-based vectorized backtest.
    Backtest {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Sweep entry/exit thresholds in parallel.
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Entry thresholds (comma-separated). Overrides [sweep] entry_z.
        #[arg(long, value_delimiter = ',')]
        entry_grid: Option<Vec<f64>>,

        /// Exit thresholds (comma-separated). Overrides [sweep] exit_z.
        #[arg(long, value_delimiter = ',')]
        exit_grid: Option<Vec<f64>>,

        /// Number of top results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

/// Inputs shared by every pair command. Flags override the config file.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pair as Y_X (e.g. KO_PEP).
    #[arg(long)]
    pair: Option<String>,

    /// Dependent ticker (with --x, instead of --pair).
    #[arg(long)]
    y: Option<String>,

    /// Regressor ticker (with --y, instead of --pair).
    #[arg(long)]
    x: Option<String>,

    /// Wide price CSV.
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Signal CSV with date, spread and optional z-score columns.
    #[arg(long)]
    signals: Option<PathBuf>,

    /// Generate a synthetic co-integrated pair instead of reading prices.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Starting cash.
    #[arg(long)]
    cash: Option<f64>,

    /// Rolling z-score window.
    #[arg(long)]
    window: Option<usize>,

    #[arg(long)]
    entry_z: Option<f64>,

    #[arg(long)]
    exit_z: Option<f64>,

    /// Fraction of equity deployed per spread (0-1].
    #[arg(long)]
    risk_frac: Option<f64>,

    /// Proportional fee per unit of notional.
    #[arg(long)]
    fee_rate: Option<f64>,

    /// Fixed hedge ratio (skips OLS).
    #[arg(long)]
    beta: Option<f64>,

    /// Output directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Clean { prices, out } => run_clean(prices, out),
        Commands::Hedge { run, out } => run_hedge_cmd(run, out),
        Commands::Paper { run } => run_paper_cmd(run),
        Commands::Backtest { run } => run_backtest_cmd(run),
        Commands::Sweep {
            run,
            entry_grid,
            exit_grid,
            top,
        } => run_sweep_cmd(run, entry_grid, exit_grid, top),
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();
}

// ─── Config resolution ──────────────────────────────────────────────

/// Build a config from `--config` (if given) and apply flag overrides.
fn resolve_config(args: RunArgs) -> Result<BacktestConfig> {
    let pair_flag = pair_override(&args)?;
    let mut config = match (&args.config, pair_flag) {
        (Some(path), pair) => {
            let mut config = BacktestConfig::from_file(path)?;
            if let Some(pair) = pair {
                config.pair = pair;
            }
            config
        }
        (None, Some(pair)) => BacktestConfig::for_pair(&pair.y, &pair.x),
        (None, None) => bail!("give --config, --pair Y_X, or both --y and --x"),
    };

    if let Some(path) = args.prices {
        config.data.prices = Some(path);
    }
    if let Some(path) = args.signals {
        config.data.signals = Some(path);
    }
    if args.synthetic {
        config.data.synthetic = true;
    }
    if let Some(start) = args.start {
        config.data.start = Some(parse_date(&start)?);
    }
    if let Some(end) = args.end {
        config.data.end = Some(parse_date(&end)?);
    }
    if let Some(beta) = args.beta {
        config.data.hedge_ratio = Some(beta);
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    let engine = &mut config.engine;
    if let Some(v) = args.cash {
        engine.starting_cash = v;
    }
    if let Some(v) = args.window {
        engine.window = v;
    }
    if let Some(v) = args.entry_z {
        engine.entry_z = v;
    }
    if let Some(v) = args.exit_z {
        engine.exit_z = v;
    }
    if let Some(v) = args.risk_frac {
        engine.risk_fraction = v;
    }
    if let Some(v) = args.fee_rate {
        engine.fee_rate = v;
    }

    config.validate()?;
    tracing::debug!(
        pair = %config.pair.label(),
        window = config.engine.window,
        entry_z = config.engine.entry_z,
        exit_z = config.engine.exit_z,
        "resolved config"
    );
    Ok(config)
}

/// The pair named by `--pair` or `--y`/`--x`, if any.
fn pair_override(args: &RunArgs) -> Result<Option<PairSection>> {
    match (&args.pair, &args.y, &args.x) {
        (None, None, None) => Ok(None),
        (Some(label), None, None) => Ok(Some(PairSection::parse(label)?)),
        (None, Some(y), Some(x)) => Ok(Some(PairSection {
            y: y.to_uppercase(),
            x: x.to_uppercase(),
        })),
        (Some(_), _, _) => bail!("--pair cannot be combined with --y/--x"),
        _ => bail!("--y and --x must be given together"),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_clean(prices: PathBuf, out: PathBuf) -> Result<()> {
    let raw = read_price_csv(&prices)?;
    let (clean, report) = clean_prices(&raw);
    write(&out, &export_prices_csv(&clean)?)?;

    println!("[clean] Dropped {} bad rows (NaN or <=0)", report.invalid_dropped);
    if report.duplicates_dropped > 0 {
        println!("[clean] Dropped {} duplicate dates", report.duplicates_dropped);
    }
    println!(
        "[clean] Final shape: {} rows × {} tickers",
        clean.len(),
        clean.tickers.len()
    );
    if let (Some(first), Some(last)) = (clean.dates.first(), clean.dates.last()) {
        println!("[clean] Date range: {first} -> {last}");
    }
    println!("[clean] Saved cleaned data to {}", out.display());
    Ok(())
}

fn run_hedge_cmd(args: RunArgs, out: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(args)?;
    let data = prepare_data(&config, ZColumnPolicy::RollingOnly)?;
    let report = hedge_report(&data.frame)?;

    let out = out.unwrap_or_else(|| {
        config
            .output
            .dir
            .join(format!("hedge_results_{}.csv", config.pair.label()))
    });
    write(&out, &export_hedge_csv(&report)?)?;

    print_hedge(&config, &report);
    println!("Saved to: {} (rows={})", out.display(), report.rows.len());
    Ok(())
}

fn run_paper_cmd(args: RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let result = run_paper(&config)?;
    print_paper(&result);

    let run_dir = save_artifacts(&result, &config.output.dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_backtest_cmd(args: RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let result = run_backtest(&config)?;
    print_backtest(&result);

    let out = config
        .output
        .dir
        .join(format!("backtest_results_{}.csv", config.pair.label()));
    write(&out, &export_backtest_csv(&result)?)?;
    println!("Saved time series to: {}", out.display());
    Ok(())
}

fn run_sweep_cmd(
    args: RunArgs,
    entry_grid: Option<Vec<f64>>,
    exit_grid: Option<Vec<f64>>,
    top: usize,
) -> Result<()> {
    let mut config = resolve_config(args)?;
    if let Some(grid) = entry_grid {
        config.sweep.entry_z = grid;
    }
    if let Some(grid) = exit_grid {
        config.sweep.exit_z = grid;
    }

    let data = prepare_data(&config, ZColumnPolicy::RollingOnly)?;
    let points = run_sweep(&config, &data)?;
    if points.is_empty() {
        bail!("sweep grid has no valid (entry_z > exit_z >= 0) combinations");
    }
    print_sweep(&config, &points, top);

    let out = config
        .output
        .dir
        .join(format!("sweep_{}.csv", config.pair.label()));
    write(&out, &export_sweep_csv(&points)?)?;
    println!("Saved sweep to: {}", out.display());
    Ok(())
}

// ─── Summaries ──────────────────────────────────────────────────────

fn print_stats(stats: &PerformanceStats) {
    println!("Days:           {}", stats.num_days);
    println!("Total Return:   {:.2}%", stats.total_return * 100.0);
    println!("Annual Return:  {:.2}%", stats.annual_return * 100.0);
    println!("Annual Vol:     {:.2}%", stats.annual_vol * 100.0);
    println!("Sharpe:         {:.2}", stats.sharpe);
    println!("Max Drawdown:   {:.2}%", stats.max_drawdown * 100.0);
}

fn print_hedge(config: &BacktestConfig, report: &HedgeReport) {
    println!();
    println!("=== OLS Hedge ({}) ===", config.pair.label());
    println!("Beta:           {:.4}", report.fit.beta);
    println!("Alpha:          {:.4}", report.fit.alpha);
    println!("R²:             {:.3}", report.fit.r_squared);
    println!("Spread Mean:    {:.4}", report.spread_mean);
    println!("Spread Std:     {:.4}", report.spread_std);
}

fn print_paper(result: &PaperResult) {
    let run = &result.run;
    println!();
    println!("=== Paper Trading Summary ===");
    println!("Pair:           {}, hedge beta≈{:.4}", result.pair, run.beta);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!("Trades:         {}", run.trades.len());
    println!();
    println!("--- Performance ---");
    print_stats(&run.stats);
    println!("Total Fees:     ${:.2}", run.fees_paid);
    if let Some(equity) = run.final_equity() {
        println!("Final Equity:   ${:.2}", equity);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_backtest(result: &BacktestResult) {
    println!();
    println!("=== Backtest Summary ===");
    println!("Pair:           {}, hedge beta={:.4}", result.pair, result.run.beta);
    if let Some(column) = &result.zscore_column {
        println!("Z Column:       {column}");
    }
    println!();
    println!("--- Performance ---");
    print_stats(&result.run.stats);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_sweep(config: &BacktestConfig, points: &[SweepPoint], top: usize) {
    println!();
    println!("=== Threshold Sweep ({}) ===", config.pair.label());
    println!(
        "{:>8} {:>8} {:>8} {:>10} {:>10} {:>7}",
        "entry_z", "exit_z", "sharpe", "return", "max_dd", "trades"
    );
    for p in points.iter().take(top) {
        println!(
            "{:>8.2} {:>8.2} {:>8.2} {:>9.2}% {:>9.2}% {:>7}",
            p.entry_z,
            p.exit_z,
            p.stats.sharpe,
            p.stats.total_return * 100.0,
            p.stats.max_drawdown * 100.0,
            p.trades
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KO_PEP: &str = "[pair]\ny = \"KO\"\nx = \"PEP\"\n\n[data]\nsynthetic = true\n";

    fn resolve(argv: &[&str]) -> Result<BacktestConfig> {
        let cli = Cli::try_parse_from(argv)?;
        match cli.command {
            Commands::Paper { run } => resolve_config(run),
            _ => unreachable!("tests only build paper commands"),
        }
    }

    fn config_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("pair.toml");
        std::fs::write(&path, KO_PEP).unwrap();
        path.display().to_string()
    }

    #[test]
    fn config_pair_is_used_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);
        let config = resolve(&["pairlab", "paper", "--config", &path]).unwrap();
        assert_eq!(config.pair.label(), "KO_PEP");
    }

    #[test]
    fn leg_flags_override_config_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);
        let config = resolve(&[
            "pairlab", "paper", "--config", &path, "--y", "xom", "--x", "cvx",
        ])
        .unwrap();
        assert_eq!(config.pair.label(), "XOM_CVX");
        assert!(config.data.synthetic);
    }

    #[test]
    fn pair_flag_overrides_config_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);
        let config = resolve(&["pairlab", "paper", "--config", &path, "--pair", "XOM_CVX"]).unwrap();
        assert_eq!(config.pair.label(), "XOM_CVX");
    }

    #[test]
    fn lone_leg_flag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);
        assert!(resolve(&["pairlab", "paper", "--config", &path, "--y", "XOM"]).is_err());
        assert!(resolve(&["pairlab", "paper", "--synthetic", "--x", "CVX"]).is_err());
    }

    #[test]
    fn pair_and_leg_flags_conflict() {
        let err = resolve(&[
            "pairlab", "paper", "--synthetic", "--pair", "KO_PEP", "--y", "XOM", "--x", "CVX",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("--pair"));
    }

    #[test]
    fn engine_flags_override_defaults() {
        let config = resolve(&[
            "pairlab", "paper", "--synthetic", "--y", "ko", "--x", "pep", "--window", "20",
            "--entry-z", "2.5",
        ])
        .unwrap();
        assert_eq!(config.pair.label(), "KO_PEP");
        assert_eq!(config.engine.window, 20);
        assert_eq!(config.engine.entry_z, 2.5);
    }
}
