//! Serializable run configuration loaded from TOML.
//!
//! ```toml
//! [pair]
//! y = "KO"
//! x = "PEP"
//!
//! [data]
//! prices = "data/adj_close.csv"
//! signals = "data/hedge_results_KO_PEP.csv"   # optional
//! start = "2018-01-01"                         # optional
//! end = "2023-12-31"                           # optional
//!
//! [engine]
//! starting_cash = 100000.0
//! window = 60
//! entry_z = 2.0
//! exit_z = 0.5
//!
//! [output]
//! dir = "output"
//! ```
//!
//! Every `[engine]` key has a default, as do `[output]` and `[sweep]`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use pairlab_core::engine::EngineConfig;
use pairlab_core::error::SimError;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid engine settings: {0}")]
    Engine(#[from] SimError),
}

/// Complete configuration for one pair run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub pair: PairSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub sweep: SweepSection,
}

/// The two legs. Y is the dependent series, X the regressor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSection {
    pub y: String,
    pub x: String,
}

impl PairSection {
    /// Parse a `Y_X` pair label such as `XOM_CVX`.
    pub fn parse(label: &str) -> Result<Self, ConfigError> {
        match label.split_once('_') {
            Some((y, x)) if !y.is_empty() && !x.is_empty() && !x.contains('_') => Ok(Self {
                y: y.trim().to_uppercase(),
                x: x.trim().to_uppercase(),
            }),
            _ => Err(ConfigError::Invalid(format!(
                "pair must look like Y_X, got '{label}'"
            ))),
        }
    }

    /// `Y_X` label used in file names.
    pub fn label(&self) -> String {
        format!("{}_{}", self.y, self.x)
    }
}

/// Where the input series come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Wide price CSV: `date,<TICKER>,<TICKER>,...`.
    #[serde(default)]
    pub prices: Option<PathBuf>,
    /// Optional hedge/signal CSV with `date`, `spread` and a z-score column.
    #[serde(default)]
    pub signals: Option<PathBuf>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Generate a seeded co-integrated pair instead of reading prices.
    #[serde(default)]
    pub synthetic: bool,
    /// Fixed hedge ratio. When absent it is estimated by OLS.
    #[serde(default)]
    pub hedge_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Threshold grid for `sweep`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    #[serde(default = "default_entry_grid")]
    pub entry_z: Vec<f64>,
    #[serde(default = "default_exit_grid")]
    pub exit_z: Vec<f64>,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            entry_z: default_entry_grid(),
            exit_z: default_exit_grid(),
        }
    }
}

fn default_entry_grid() -> Vec<f64> {
    vec![1.5, 2.0, 2.5, 3.0]
}

fn default_exit_grid() -> Vec<f64> {
    vec![0.0, 0.25, 0.5, 0.75, 1.0]
}

impl BacktestConfig {
    /// Config for a pair with every other section defaulted.
    pub fn for_pair(y: &str, x: &str) -> Self {
        Self {
            pair: PairSection {
                y: y.trim().to_uppercase(),
                x: x.trim().to_uppercase(),
            },
            data: DataSection::default(),
            engine: EngineConfig::default(),
            output: OutputSection::default(),
            sweep: SweepSection::default(),
        }
    }

    /// Parse and validate a TOML document. Tickers are upper-cased.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        config.pair.y = config.pair.y.trim().to_uppercase();
        config.pair.x = config.pair.x.trim().to_uppercase();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.y.is_empty() || self.pair.x.is_empty() {
            return Err(ConfigError::Invalid("pair tickers must be non-empty".into()));
        }
        if self.pair.y == self.pair.x {
            return Err(ConfigError::Invalid(format!(
                "pair legs must differ, both are '{}'",
                self.pair.y
            )));
        }
        if self.data.prices.is_none() && !self.data.synthetic {
            return Err(ConfigError::Invalid(
                "[data] needs either `prices` or `synthetic = true`".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        if let Some(beta) = self.data.hedge_ratio {
            if !beta.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "hedge_ratio must be finite, got {beta}"
                )));
            }
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[pair]
y = "ko"
x = "PEP"

[data]
prices = "data/adj_close.csv"
start = "2020-01-01"
end = "2023-12-31"

[engine]
window = 30
entry_z = 2.5
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = BacktestConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.pair.y, "KO");
        assert_eq!(config.pair.x, "PEP");
        assert_eq!(config.engine.window, 30);
        assert_eq!(config.engine.entry_z, 2.5);
        assert_eq!(config.engine.exit_z, 0.5);
        assert_eq!(config.engine.starting_cash, 100_000.0);
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(
            config.data.start,
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert!(!config.data.synthetic);
    }

    #[test]
    fn run_id_deterministic_and_param_sensitive() {
        let a = BacktestConfig::from_toml(SAMPLE).unwrap();
        let b = BacktestConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);

        let mut c = a.clone();
        c.engine.exit_z = 0.25;
        assert_ne!(a.run_id().unwrap(), c.run_id().unwrap());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let text = SAMPLE.replace("entry_z = 2.5", "entry_z = 0.4");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Engine(SimError::Configuration(_)))
        ));
    }

    #[test]
    fn rejects_identical_legs() {
        let text = SAMPLE.replace("y = \"ko\"", "y = \"pep\"");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_missing_price_source() {
        let text = "[pair]\ny = \"A\"\nx = \"B\"\n";
        assert!(BacktestConfig::from_toml(text).is_err());
        let synthetic = format!("{text}[data]\nsynthetic = true\n");
        assert!(BacktestConfig::from_toml(&synthetic).is_ok());
    }

    #[test]
    fn rejects_reversed_dates() {
        let text = SAMPLE.replace("2023-12-31", "2019-12-31");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            BacktestConfig::from_toml("[pair\ny = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn pair_label_round_trip() {
        let pair = PairSection::parse("xom_cvx").unwrap();
        assert_eq!(pair.y, "XOM");
        assert_eq!(pair.x, "CVX");
        assert_eq!(pair.label(), "XOM_CVX");
        assert!(PairSection::parse("XOM").is_err());
        assert!(PairSection::parse("_CVX").is_err());
        assert!(PairSection::parse("A_B_C").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/pairlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
