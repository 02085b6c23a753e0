//! Dataset Verification Module
//!
//! Checks every configured dataset against its live source: can it be
//! fetched, does it parse, and does it contain the sites the registry
//! expects. Run this before a classroom session to catch moved or changed
//! catalog files.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, DatasetConfig};
use crate::ingest::fetch::load_dataset;
use crate::logging;
use crate::sites::Site;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub datasets: Vec<DatasetVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetVerification {
    pub name: String,
    pub status: VerificationStatus,
    pub observation_count: usize,
    pub skipped_rows: usize,
    pub missing_values: usize,
    pub sites_found: Vec<String>,
    pub sites_missing: Vec<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Dataset Verification
// ============================================================================

/// Loads one dataset and compares its contents against the site registry.
///
/// Status is `Failed` when the dataset cannot be loaded, `PartialSuccess`
/// when registered sites are absent or rows were skipped, else `Success`.
/// Only registry sites that list no channels, or a channel present in the
/// dataset, are expected.
pub fn verify_dataset(
    client: &reqwest::blocking::Client,
    dataset: &DatasetConfig,
    sites: &[Site],
) -> DatasetVerification {
    let mut result = DatasetVerification {
        name: dataset.name.clone(),
        status: VerificationStatus::Failed,
        observation_count: 0,
        skipped_rows: 0,
        missing_values: 0,
        sites_found: Vec::new(),
        sites_missing: Vec::new(),
        error_message: None,
    };

    let table = match load_dataset(client, dataset) {
        Ok(table) => table,
        Err(e) => {
            logging::log_load_failure(&dataset.name, "verification", &e);
            result.error_message = Some(e.to_string());
            return result;
        }
    };

    result.observation_count = table.observations.len();
    result.skipped_rows = table.skipped_rows;
    result.missing_values = table
        .observations
        .iter()
        .filter(|o| o.valid_value().is_none())
        .count();

    let found: BTreeSet<&str> = table.observations.iter().map(|o| o.site_name.as_str()).collect();
    let channels: BTreeSet<&str> = table
        .observations
        .iter()
        .filter_map(|o| o.channel.as_deref())
        .collect();
    result.sites_found = found.iter().map(|s| s.to_string()).collect();

    for site in sites {
        let expected_here =
            site.channels.is_empty() || site.channels.iter().any(|c| channels.contains(c.as_str()));
        if expected_here && !found.contains(site.name.as_str()) {
            result.sites_missing.push(site.name.clone());
        }
    }

    result.status = if result.sites_missing.is_empty() && result.skipped_rows == 0 {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };

    result
}

/// Verifies every dataset in the config.
pub fn run_verification(
    client: &reqwest::blocking::Client,
    config: &AppConfig,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        datasets: Vec::new(),
        summary: VerificationSummary {
            total: config.datasets.len(),
            ..Default::default()
        },
    };

    for dataset in &config.datasets {
        let result = verify_dataset(client, dataset, &config.sites);
        match result.status {
            VerificationStatus::Success | VerificationStatus::PartialSuccess => {
                report.summary.working += 1
            }
            VerificationStatus::Failed => report.summary.failed += 1,
        }
        report.datasets.push(result);
    }

    logging::log_load_summary(
        report.summary.total,
        report.summary.working,
        report.summary.failed,
    );
    report
}

/// Share of datasets that loaded, in percent. 0 when nothing is configured.
pub fn success_rate(summary: &VerificationSummary) -> f64 {
    if summary.total > 0 {
        (summary.working as f64 / summary.total as f64) * 100.0
    } else {
        0.0
    }
}
