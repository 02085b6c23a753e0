/// Structured logging for the analysis pipeline
///
/// Thin layer over the `log` facade that tags every message with the data
/// source and, where relevant, the dataset or site it concerns. The backend
/// is `env_logger`; `RUST_LOG` overrides the configured level.

use std::fmt;

use log::Level;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Csv,
    Station,
    Http,
    Analysis,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv => write!(f, "CSV"),
            DataSource::Station => write!(f, "STM"),
            DataSource::Http => write!(f, "HTTP"),
            DataSource::Analysis => write!(f, "ANA"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - dataset legitimately has nothing for the request
    Expected,
    /// Unexpected failure - catalog unreachable or format changed
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Initialization
// ---------------------------------------------------------------------------

/// Initialize the global logger at `level` ("error" .. "trace").
///
/// `RUST_LOG`, when set, takes precedence. Calling this twice is harmless;
/// the second call is ignored.
pub fn init_logger(level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    let _ = env_logger::Builder::new()
        .parse_filters(&filter)
        .format_timestamp_secs()
        .try_init();
}

fn emit(level: Level, source: DataSource, subject: Option<&str>, message: &str) {
    let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();
    log::log!(level, "{}{}: {}", source, subject_part, message);
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, subject: Option<&str>, message: &str) {
    emit(Level::Info, source, subject, message);
}

/// Log a warning message
pub fn warn(source: DataSource, subject: Option<&str>, message: &str) {
    emit(Level::Warn, source, subject, message);
}

/// Log an error message
pub fn error(source: DataSource, subject: Option<&str>, message: &str) {
    emit(Level::Error, source, subject, message);
}

/// Log a debug message
pub fn debug(source: DataSource, subject: Option<&str>, message: &str) {
    emit(Level::Debug, source, subject, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a dataset load failure from its error message.
///
/// Matches the `Display` prefixes of `IngestError`.
pub fn classify_load_failure(error_message: &str) -> FailureType {
    if error_message.starts_with("No data available") {
        // empty extract, e.g. a site with no coverage in the requested period
        FailureType::Expected
    } else if error_message.contains("HTTP error")
        || error_message.contains("Request failed")
        || error_message.contains("Parse error")
        || error_message.contains("CSV error")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a dataset failure with automatic classification
pub fn log_load_failure(dataset: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_load_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(DataSource::System, Some(dataset), &message),
        FailureType::Unexpected => error(DataSource::System, Some(dataset), &message),
        FailureType::Unknown => warn(DataSource::System, Some(dataset), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of dataset loading
pub fn log_load_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Load complete: {}/{} datasets loaded, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(DataSource::System, None, &message);
    } else if successful == 0 {
        error(DataSource::System, None, &message);
    } else {
        warn(DataSource::System, None, &message);
    }
}
