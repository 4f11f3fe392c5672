//! Price and signal ingestion for the runner.
//!
//! Input is a wide price table, one row per date and one column per ticker:
//!
//! ```text
//! date,KO,PEP,XOM
//! 2020-01-02,52.1,133.0,70.9
//! ```
//!
//! Cleaning follows a fixed policy:
//! 1. Sort rows by date (stable) and keep the first row of each date
//! 2. Coerce unparsable or non-finite cells to missing
//! 3. Drop any row with a missing or non-positive value
//!
//! An optional signal table (the hedge report output, or any CSV with `date`
//! and `spread` columns) can be inner-joined onto a pair frame.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use pairlab_core::domain::PairFrame;
use pairlab_core::error::SimError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path}: unparsable date '{value}' on line {line}")]
    BadDate {
        path: String,
        value: String,
        line: u64,
    },

    #[error("ticker '{ticker}' not found (available: {available})")]
    UnknownTicker { ticker: String, available: String },

    #[error("no rows left for {0}")]
    Empty(String),

    #[error(transparent)]
    Sim(#[from] SimError),
}

// ─── Price table ────────────────────────────────────────────────────

/// Wide price table. `rows[i][j]` is the price of `tickers[j]` on `dates[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<Option<f64>>>,
}

/// What cleaning removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanReport {
    pub rows_in: usize,
    pub duplicates_dropped: usize,
    /// Rows dropped for a missing or non-positive value.
    pub invalid_dropped: usize,
    pub rows_out: usize,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Rows with `start <= date <= end`. Either bound may be open.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceTable {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| {
                let d = self.dates[i];
                start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e)
            })
            .collect();
        PriceTable {
            tickers: self.tickers.clone(),
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            rows: keep.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Pull the Y and X columns into a pair frame, dropping rows where
    /// either leg is missing.
    pub fn select_pair(&self, y: &str, x: &str) -> Result<PairFrame, LoadError> {
        let jy = self.require(y)?;
        let jx = self.require(x)?;

        let mut dates = Vec::with_capacity(self.len());
        let mut price_y = Vec::with_capacity(self.len());
        let mut price_x = Vec::with_capacity(self.len());
        for (date, row) in self.dates.iter().zip(&self.rows) {
            if let (Some(py), Some(px)) = (row[jy], row[jx]) {
                dates.push(*date);
                price_y.push(Some(py));
                price_x.push(Some(px));
            }
        }
        let frame = PairFrame::new(y, x, dates, price_y, price_x);
        frame.validate()?;
        Ok(frame)
    }

    fn require(&self, ticker: &str) -> Result<usize, LoadError> {
        self.column_index(ticker)
            .ok_or_else(|| LoadError::UnknownTicker {
                ticker: ticker.to_string(),
                available: self.tickers.join(", "),
            })
    }
}

/// Apply the cleaning policy. The input table is not modified.
pub fn clean_prices(table: &PriceTable) -> (PriceTable, CleanReport) {
    let mut order: Vec<usize> = (0..table.len()).collect();
    order.sort_by_key(|&i| table.dates[i]);

    let mut seen = HashSet::new();
    let mut duplicates_dropped = 0;
    let mut invalid_dropped = 0;
    let mut dates = Vec::new();
    let mut rows = Vec::new();

    for i in order {
        if !seen.insert(table.dates[i]) {
            duplicates_dropped += 1;
            continue;
        }
        let row = &table.rows[i];
        if row.iter().all(|v| matches!(v, Some(p) if *p > 0.0)) {
            dates.push(table.dates[i]);
            rows.push(row.clone());
        } else {
            invalid_dropped += 1;
        }
    }

    let report = CleanReport {
        rows_in: table.len(),
        duplicates_dropped,
        invalid_dropped,
        rows_out: dates.len(),
    };
    if invalid_dropped > 0 || duplicates_dropped > 0 {
        tracing::warn!(
            duplicates = duplicates_dropped,
            invalid = invalid_dropped,
            "dropped bad price rows"
        );
    }
    tracing::info!(
        rows = report.rows_out,
        tickers = table.tickers.len(),
        first = ?dates.first(),
        last = ?dates.last(),
        "cleaned price table"
    );

    (
        PriceTable {
            tickers: table.tickers.clone(),
            dates,
            rows,
        },
        report,
    )
}

/// Read a wide price CSV from disk.
pub fn read_price_csv(path: &Path) -> Result<PriceTable, LoadError> {
    let file = open(path)?;
    parse_price_csv(file, &path.display().to_string())
}

/// Parse a wide price CSV. `source` names the input in error messages.
///
/// Ticker headers are upper-cased. Cells that do not parse as a finite
/// number become missing.
pub fn parse_price_csv<R: Read>(reader: R, source: &str) -> Result<PriceTable, LoadError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(source, e))?
        .clone();
    let date_col = find_date_column(&headers, source)?;

    let ticker_cols: Vec<usize> = (0..headers.len()).filter(|&j| j != date_col).collect();
    let tickers = ticker_cols
        .iter()
        .map(|&j| headers[j].trim().to_uppercase())
        .collect();

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error(source, e))?;
        dates.push(record_date(&record, date_col, source)?);
        rows.push(
            ticker_cols
                .iter()
                .map(|&j| record.get(j).and_then(parse_cell))
                .collect(),
        );
    }

    Ok(PriceTable {
        tickers,
        dates,
        rows,
    })
}

// ─── Signal table ───────────────────────────────────────────────────

/// Which precomputed z-score columns a consumer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZColumnPolicy {
    /// `zscore`, else the first `zscore_roll*`.
    RollingOnly,
    /// As `RollingOnly`, then falls back to `zscore_full`.
    AllowFullSample,
}

/// Spread and (optionally) z-score columns keyed by date.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTable {
    pub dates: Vec<NaiveDate>,
    pub spread: Vec<Option<f64>>,
    pub zscore: Option<Vec<Option<f64>>>,
    /// Header of the chosen z-score column.
    pub zscore_column: Option<String>,
}

pub fn read_signals_csv(path: &Path, policy: ZColumnPolicy) -> Result<SignalTable, LoadError> {
    let file = open(path)?;
    parse_signals_csv(file, &path.display().to_string(), policy)
}

/// Parse a signal CSV. A `spread` column is required; the z-score column is
/// chosen per `policy` and may be absent.
pub fn parse_signals_csv<R: Read>(
    reader: R,
    source: &str,
    policy: ZColumnPolicy,
) -> Result<SignalTable, LoadError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(source, e))?
        .clone();
    let date_col = find_date_column(&headers, source)?;
    let spread_col = headers
        .iter()
        .position(|h| h.trim() == "spread")
        .ok_or_else(|| LoadError::MissingColumn {
            path: source.to_string(),
            column: "spread".into(),
        })?;
    let z_col = choose_zscore_column(&headers, policy);

    let mut dates = Vec::new();
    let mut spread = Vec::new();
    let mut zscore = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error(source, e))?;
        dates.push(record_date(&record, date_col, source)?);
        spread.push(record.get(spread_col).and_then(parse_cell));
        if let Some(j) = z_col {
            zscore.push(record.get(j).and_then(parse_cell));
        }
    }

    let zscore_column = z_col.map(|j| headers[j].trim().to_string());
    if let Some(name) = &zscore_column {
        tracing::info!(column = %name, "using precomputed z-score");
    }
    Ok(SignalTable {
        dates,
        spread,
        zscore: z_col.map(|_| zscore),
        zscore_column,
    })
}

fn choose_zscore_column(headers: &csv::StringRecord, policy: ZColumnPolicy) -> Option<usize> {
    let names: Vec<&str> = headers.iter().map(str::trim).collect();
    names
        .iter()
        .position(|h| *h == "zscore")
        .or_else(|| names.iter().position(|h| h.starts_with("zscore_roll")))
        .or_else(|| match policy {
            ZColumnPolicy::AllowFullSample => names.iter().position(|h| *h == "zscore_full"),
            ZColumnPolicy::RollingOnly => None,
        })
}

/// Inner-join a signal table onto a pair frame by date.
///
/// Rows of the frame with no signal row are dropped. The joined frame
/// carries the signal's spread and, if present, its z-score.
pub fn join_signals(frame: &PairFrame, signals: &SignalTable) -> Result<PairFrame, LoadError> {
    let by_date: HashMap<NaiveDate, usize> = signals
        .dates
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .rev()
        .collect();

    let mut dates = Vec::new();
    let mut price_y = Vec::new();
    let mut price_x = Vec::new();
    let mut spread = Vec::new();
    let mut zscore = Vec::new();
    for (t, date) in frame.dates.iter().enumerate() {
        let Some(&i) = by_date.get(date) else {
            continue;
        };
        dates.push(*date);
        price_y.push(frame.price_y[t]);
        price_x.push(frame.price_x[t]);
        spread.push(signals.spread[i]);
        if let Some(z) = &signals.zscore {
            zscore.push(z[i]);
        }
    }

    if dates.is_empty() && !frame.is_empty() {
        return Err(LoadError::Empty(format!(
            "{}/{} after joining signals",
            frame.y_ticker, frame.x_ticker
        )));
    }

    let mut joined = PairFrame::new(
        frame.y_ticker.clone(),
        frame.x_ticker.clone(),
        dates,
        price_y,
        price_x,
    )
    .with_spread(spread);
    if signals.zscore.is_some() {
        joined = joined.with_zscore(zscore);
    }
    joined.validate()?;
    Ok(joined)
}

// ─── Fingerprint ────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over a pair frame's contents.
///
/// Covers tickers, dates, both price columns, and any precomputed spread or
/// z-score. Missing cells hash as a distinct marker.
pub fn dataset_hash(frame: &PairFrame) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(frame.y_ticker.as_bytes());
    hasher.update(b"/");
    hasher.update(frame.x_ticker.as_bytes());

    let columns = [
        Some(frame.price_y.as_slice()),
        Some(frame.price_x.as_slice()),
        frame.spread.as_deref(),
        frame.zscore.as_deref(),
    ];
    for (t, date) in frame.dates.iter().enumerate() {
        hasher.update(date.to_string().as_bytes());
        for column in columns.iter() {
            match column {
                Some(values) => hash_cell(&mut hasher, values[t]),
                None => {
                    hasher.update(b"-");
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_cell(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(b"na");
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn csv_error(source: &str, e: csv::Error) -> LoadError {
    LoadError::Csv {
        path: source.to_string(),
        source: e,
    }
}

fn find_date_column(headers: &csv::StringRecord, source: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("date"))
        .ok_or_else(|| LoadError::MissingColumn {
            path: source.to_string(),
            column: "date".into(),
        })
}

fn record_date(record: &csv::StringRecord, col: usize, source: &str) -> Result<NaiveDate, LoadError> {
    let raw = record.get(col).unwrap_or("");
    parse_date(raw).ok_or_else(|| LoadError::BadDate {
        path: source.to_string(),
        value: raw.to_string(),
        line: record.position().map_or(0, |p| p.line()),
    })
}

/// `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.split(|c| c == ' ' || c == 'T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
