//! TOML configuration for datasets, sites and analysis thresholds.
//!
//! A minimal config only needs one `[[datasets]]` entry; every other key has
//! a default. Example:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [anomaly]
//! moderate = 1.0
//! extreme = 2.0
//! dry_spell_min_length = 3
//!
//! [[datasets]]
//! name = "ismn_austria"
//! url = "https://example.org/data/soil_moisture.csv"
//!
//! [datasets.columns]
//! time = "time"
//! value = "sm"
//!
//! [[sites]]
//! name = "Grafendorf"
//! latitude = 48.55
//! longitude = 16.02
//! channels = ["sm_0.05"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::classify::ClassThresholds;
use crate::sites::Site;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV_VAR: &str = "SOILMON_CONFIG";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "soilmon.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// |z| at or above this is "dry" / "wet".
    pub moderate: f64,
    /// |z| at or above this is "extremely dry" / "extremely wet".
    pub extreme: f64,
    /// Minimum run of consecutive dry scores reported as a dry spell.
    pub dry_spell_min_length: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            moderate: 1.0,
            extreme: 2.0,
            dry_spell_min_length: 3,
        }
    }
}

impl AnomalyConfig {
    pub fn thresholds(&self) -> ClassThresholds {
        ClassThresholds {
            moderate: self.moderate,
            extreme: self.extreme,
        }
    }
}

/// On-disk layout of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Delimited table with a header row.
    #[default]
    Csv,
    /// Whitespace-separated station file: `YYYY/MM/DD HH:MM value flag...`
    Station,
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Url(String),
    Path(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: DatasetFormat,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Station files carry no site column; these name and place the site.
    pub site: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Channel label applied to every row of a station file.
    pub channel: Option<String>,
    /// Backscatter channel to grid and reduce alongside the table outputs.
    pub cube_channel: Option<String>,
}

fn default_delimiter() -> char {
    ','
}

impl DatasetConfig {
    /// Resolves the source. Exactly one of `url` / `path` must be set.
    pub fn source(&self) -> Result<DatasetSource, ConfigError> {
        match (&self.url, &self.path) {
            (Some(url), None) => Ok(DatasetSource::Url(url.clone())),
            (None, Some(path)) => Ok(DatasetSource::Path(path.clone())),
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "dataset '{}' sets both url and path",
                self.name
            ))),
            (None, None) => Err(ConfigError::Invalid(format!(
                "dataset '{}' needs a url or a path",
                self.name
            ))),
        }
    }
}

/// Column names of a CSV dataset. Coordinates and channel are optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub time: String,
    pub site: String,
    pub value: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub channel: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            site: "site".to_string(),
            value: "value".to_string(),
            latitude: Some("latitude".to_string()),
            longitude: Some("longitude".to_string()),
            channel: Some("channel".to_string()),
        }
    }
}

impl AppConfig {
    /// Parses and validates a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolves the config path: the given one, else `soilmon.toml`.
    ///
    /// The CLI fills `explicit` from `--config` or `SOILMON_CONFIG`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.anomaly.moderate > 0.0 && self.anomaly.moderate < self.anomaly.extreme) {
            return Err(ConfigError::Invalid(format!(
                "anomaly thresholds must satisfy 0 < moderate < extreme, got {} / {}",
                self.anomaly.moderate, self.anomaly.extreme
            )));
        }
        for dataset in &self.datasets {
            dataset.source()?;
            if dataset.format == DatasetFormat::Station && dataset.site.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "station dataset '{}' needs a site name",
                    dataset.name
                )));
            }
            if !dataset.delimiter.is_ascii() {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' delimiter must be a single ASCII character",
                    dataset.name
                )));
            }
        }
        crate::sites::validate_sites(&self.sites).map_err(ConfigError::Invalid)
    }

    pub fn find_dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }
}
