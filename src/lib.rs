//! Soil-moisture and SAR backscatter analysis for the remote-sensing course.
//!
//! Loads tabular datasets, aggregates them per site and per pixel, and
//! computes monthly-climatology z-score anomalies for drought discussion.
//!
//! Module map:
//! - `model`    — observations, scores, error types; no I/O.
//! - `config`   — TOML configuration.
//! - `sites`    — site registry.
//! - `ingest`   — CSV / station-file loading over HTTP or from disk.
//! - `analysis` — statistics, grouping, aggregation, anomaly transform.
//! - `cube`     — gridded backscatter reductions.
//! - `classify` — anomaly classes and dry-spell detection.
//! - `pipeline` — per-dataset end-to-end analysis.
//! - `export`   — CSV / JSON output.
//! - `verify`   — dataset availability checks.
//! - `logging`  — source-tagged logging helpers.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod cube;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod sites;
pub mod verify;
