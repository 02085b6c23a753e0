/// Aggregation and anomaly analysis for loaded observation tables.
///
/// Submodules:
/// - `stats`     — mean / sample standard deviation / z-score primitives.
/// - `groupings` — per-site buckets, (month, site) keys, time-sorted series.
/// - `aggregate` — per-site summaries, monthly resampling, row filters.
/// - `anomaly`   — monthly-climatology z-score transform.

pub mod aggregate;
pub mod anomaly;
pub mod groupings;
pub mod stats;

pub use anomaly::{anomalies_against, monthly_climatology, seasonal_anomalies};
