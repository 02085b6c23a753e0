/// Core data types for the soil-moisture / backscatter analysis crate.
///
/// This module defines the shared domain model imported by all other modules:
/// observations, group keys, anomaly scores and the error enums. Apart from
/// timestamp parsing it contains no logic and no I/O.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Channel labels
// ---------------------------------------------------------------------------

/// Sentinel-1 co-polarized backscatter channel.
pub const CHANNEL_VV: &str = "VV";

/// Sentinel-1 cross-polarized backscatter channel.
pub const CHANNEL_VH: &str = "VH";

/// Sentinel value some station files use for "no measurement".
pub const MISSING_SENTINEL: f64 = -9999.0;

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single scalar measurement tagged with time, location and site.
///
/// Corresponds to one row of a loaded table: surface soil moisture in
/// degree of saturation (%), or backscatter intensity in dB. `value` is
/// `None` when the source row carried no usable number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub site_name: String,
    pub timestamp: String, // as loaded, e.g. "2019-01-05T06:00:00Z"
    pub latitude: f64,
    pub longitude: f64,
    pub value: Option<f64>,
    pub channel: Option<String>, // "VV", "VH", "sm_0.05", ...
}

impl Observation {
    /// The measurement, treating NaN the same as an absent value.
    pub fn valid_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }

    /// Parses this observation's timestamp. See [`parse_timestamp`].
    pub fn parsed_time(&self) -> Result<DateTime<Utc>, String> {
        parse_timestamp(&self.timestamp)
    }
}

/// Partition key for climatology statistics: calendar month and site.
///
/// Years are folded together, so every January of a site lands in one group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub month: u32, // 1..=12
    pub site_name: String,
}

impl GroupKey {
    pub fn for_time(time: &DateTime<Utc>, site_name: &str) -> Self {
        GroupKey {
            month: time.month(),
            site_name: site_name.to_string(),
        }
    }
}

/// Mean and sample standard deviation for one group.
///
/// `mean` is `None` when the group has no usable values; `std_dev` is `None`
/// with fewer than two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Standardized anomaly for one input observation.
///
/// `index` is the observation's position in the input slice, so scores stay
/// joinable to their source rows. `score` is `None` when undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyScore {
    pub index: usize,
    pub site_name: String,
    pub timestamp: String,
    pub month: u32,
    pub score: Option<f64>,
}

impl AnomalyScore {
    /// The score with "undefined" expressed as NaN, for plotting tools.
    pub fn value_or_nan(&self) -> f64 {
        self.score.unwrap_or(f64::NAN)
    }

    pub fn is_defined(&self) -> bool {
        self.score.is_some()
    }
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Parses the timestamp shapes found in course datasets.
///
/// Accepted, in order: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM`, `YYYY/MM/DD HH:MM` and a bare `YYYY-MM-DD`. Naive
/// values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty timestamp".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(|| format!("unrecognized timestamp '{}'", s))
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the analysis stages.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// The transform was handed no observations at all.
    #[error("empty input: {0}")]
    EmptyInput(String),
    /// A timestamp could not be parsed.
    #[error("invalid timestamp at row {index}: '{value}'")]
    InvalidTimestamp { index: usize, value: String },
    /// A series was built from observations of more than one site.
    #[error("series for site '{expected}' received observation from '{found}'")]
    MixedSites { expected: String, found: String },
    /// No observations matched the requested cube channel.
    #[error("no cube data for channel '{0}'")]
    NoCubeData(String),
}

/// Errors that can arise when fetching or parsing a dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Non-2xx HTTP response from the remote catalog.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The request itself failed (DNS, TLS, timeout, ...).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// The body was readable but not in the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The dataset parsed but contained no usable rows.
    #[error("No data available for dataset: {0}")]
    NoData(String),
}
