//! End-to-end analysis of one loaded dataset.
//!
//! Splits the table by channel and sorts each part into per-site series,
//! then computes the monthly climatology and z-score anomalies per channel,
//! classifies them and looks for dry spells. The result is a plain
//! serializable report for `export`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::aggregate::{SiteSummary, summarize_by_site};
use crate::analysis::anomaly::{anomalies_against, monthly_climatology};
use crate::analysis::groupings::{group_keys, into_series};
use crate::classify::{AnomalyClass, ClassThresholds, DrySpell, classify, detect_dry_spells};
use crate::config::AnomalyConfig;
use crate::logging::{self, DataSource};
use crate::model::{AnalysisError, Observation};

/// One row of the monthly climatology baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimatologyRow {
    pub site_name: String,
    pub channel: Option<String>,
    pub month: u32,
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// An observation with its anomaly score and class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredObservation {
    pub site_name: String,
    pub channel: Option<String>,
    pub timestamp: String,
    pub month: u32,
    pub value: Option<f64>,
    pub score: Option<f64>,
    pub class: Option<AnomalyClass>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub dataset: String,
    pub observation_count: usize,
    pub undefined_scores: usize,
    pub summaries: Vec<SiteSummary>,
    pub climatology: Vec<ClimatologyRow>,
    pub dry_spells: Vec<DrySpell>,
    #[serde(skip)]
    pub scored: Vec<ScoredObservation>,
}

impl AnalysisReport {
    /// Number of scored observations in `class`.
    pub fn class_count(&self, class: AnomalyClass) -> usize {
        self.scored.iter().filter(|s| s.class == Some(class)).count()
    }
}

/// Runs the full analysis over one dataset's observations.
///
/// Every channel gets its own climatology, and rows without a channel form
/// one more group. Scores come out channel-major, then by site, then by time.
pub fn analyze(
    dataset: &str,
    observations: &[Observation],
    settings: &AnomalyConfig,
) -> Result<AnalysisReport, AnalysisError> {
    if observations.is_empty() {
        return Err(AnalysisError::EmptyInput(format!("dataset '{}' has no rows", dataset)));
    }

    // report bad timestamps against input positions before splitting
    group_keys(observations)?;

    let thresholds: ClassThresholds = settings.thresholds();
    let mut scored = Vec::with_capacity(observations.len());
    let mut climatology = Vec::new();
    let mut dry_spells = Vec::new();
    let mut undefined_scores = 0;

    for (channel, members) in split_by_channel(observations) {
        // site-major, time-sorted order keeps dry-spell runs contiguous
        let ordered: Vec<Observation> = into_series(&members)?
            .iter()
            .flat_map(|series| series.iter().map(|(_, obs)| obs.clone()).collect::<Vec<_>>())
            .collect();

        let baseline = monthly_climatology(&ordered)?;
        let scores = anomalies_against(&ordered, &baseline)?;
        undefined_scores += scores.iter().filter(|s| !s.is_defined()).count();

        scored.extend(scores.iter().zip(&ordered).map(|(score, obs)| ScoredObservation {
            site_name: score.site_name.clone(),
            channel: channel.clone(),
            timestamp: score.timestamp.clone(),
            month: score.month,
            value: obs.valid_value(),
            score: score.score,
            class: classify(score.score, &thresholds),
        }));

        climatology.extend(baseline.iter().map(|(key, stats)| ClimatologyRow {
            site_name: key.site_name.clone(),
            channel: channel.clone(),
            month: key.month,
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
        }));

        dry_spells.extend(
            detect_dry_spells(&scores, thresholds.moderate, settings.dry_spell_min_length)
                .into_iter()
                .map(|spell| DrySpell {
                    channel: channel.clone(),
                    ..spell
                }),
        );
    }

    logging::info(
        DataSource::Analysis,
        Some(dataset),
        &format!(
            "{} observations scored, {} undefined, {} dry spells",
            scored.len(),
            undefined_scores,
            dry_spells.len()
        ),
    );

    Ok(AnalysisReport {
        dataset: dataset.to_string(),
        observation_count: observations.len(),
        undefined_scores,
        summaries: summarize_by_site(observations),
        climatology,
        dry_spells,
        scored,
    })
}

/// Buckets observations by channel label. `None` sorts first.
fn split_by_channel(observations: &[Observation]) -> BTreeMap<Option<String>, Vec<Observation>> {
    let mut groups: BTreeMap<Option<String>, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        groups.entry(obs.channel.clone()).or_default().push(obs.clone());
    }
    groups
}
