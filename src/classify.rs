//! Anomaly classification and dry-spell detection.
//!
//! Maps z-scores onto the five drought-monitoring classes used in the course
//! notebooks and finds runs of consecutive dry scores within a site.

use serde::Serialize;

use crate::model::AnomalyScore;

/// Anomaly classes, in ascending order of wetness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AnomalyClass {
    ExtremelyDry,
    Dry,
    Normal,
    Wet,
    ExtremelyWet,
}

impl std::fmt::Display for AnomalyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AnomalyClass::ExtremelyDry => "extremely dry",
            AnomalyClass::Dry => "dry",
            AnomalyClass::Normal => "normal",
            AnomalyClass::Wet => "wet",
            AnomalyClass::ExtremelyWet => "extremely wet",
        };
        f.write_str(label)
    }
}

/// |z| cut-offs. Invariant: `0 < moderate < extreme`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassThresholds {
    pub moderate: f64,
    pub extreme: f64,
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            moderate: 1.0,
            extreme: 2.0,
        }
    }
}

/// Classifies a score. Undefined scores have no class.
///
/// Boundaries belong to the more severe class: z == -moderate is `Dry`.
pub fn classify(score: Option<f64>, thresholds: &ClassThresholds) -> Option<AnomalyClass> {
    let z = score?;
    let class = if z <= -thresholds.extreme {
        AnomalyClass::ExtremelyDry
    } else if z <= -thresholds.moderate {
        AnomalyClass::Dry
    } else if z >= thresholds.extreme {
        AnomalyClass::ExtremelyWet
    } else if z >= thresholds.moderate {
        AnomalyClass::Wet
    } else {
        AnomalyClass::Normal
    };
    Some(class)
}

/// A run of consecutive dry scores at one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrySpell {
    pub site_name: String,
    /// Set by callers that score channels separately.
    pub channel: Option<String>,
    pub start: String,
    pub end: String,
    pub length: usize,
    /// Most negative score in the run.
    pub peak: f64,
}

/// Finds runs of at least `min_length` consecutive scores `<= -threshold`.
///
/// Scores are taken per site in the order given; callers pass scores of a
/// time-sorted table. An undefined score breaks a run.
pub fn detect_dry_spells(
    scores: &[AnomalyScore],
    threshold: f64,
    min_length: usize,
) -> Vec<DrySpell> {
    let mut spells = Vec::new();
    let mut sites: Vec<&str> = scores.iter().map(|s| s.site_name.as_str()).collect();
    sites.sort_unstable();
    sites.dedup();

    for site in sites {
        let mut run: Vec<&AnomalyScore> = Vec::new();
        let site_scores = scores.iter().filter(|s| s.site_name == site);
        for score in site_scores {
            match score.score {
                Some(z) if z <= -threshold => run.push(score),
                _ => flush_run(&mut run, min_length, &mut spells),
            }
        }
        flush_run(&mut run, min_length, &mut spells);
    }
    spells
}

fn flush_run(run: &mut Vec<&AnomalyScore>, min_length: usize, spells: &mut Vec<DrySpell>) {
    if !run.is_empty() && run.len() >= min_length.max(1) {
        let peak = run
            .iter()
            .filter_map(|s| s.score)
            .fold(f64::INFINITY, f64::min);
        spells.push(DrySpell {
            site_name: run[0].site_name.clone(),
            channel: None,
            start: run[0].timestamp.clone(),
            end: run[run.len() - 1].timestamp.clone(),
            length: run.len(),
            peak,
        });
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(site: &str, day: u32, z: Option<f64>) -> AnomalyScore {
        AnomalyScore {
            index: day as usize,
            site_name: site.to_string(),
            timestamp: format!("2022-07-{:02}", day),
            month: 7,
            score: z,
        }
    }

    #[test]
    fn test_classify_boundaries_go_to_severe_class() {
        let t = ClassThresholds::default();
        assert_eq!(classify(Some(-2.0), &t), Some(AnomalyClass::ExtremelyDry));
        assert_eq!(classify(Some(-1.0), &t), Some(AnomalyClass::Dry));
        assert_eq!(classify(Some(-0.99), &t), Some(AnomalyClass::Normal));
        assert_eq!(classify(Some(0.0), &t), Some(AnomalyClass::Normal));
        assert_eq!(classify(Some(1.0), &t), Some(AnomalyClass::Wet));
        assert_eq!(classify(Some(2.5), &t), Some(AnomalyClass::ExtremelyWet));
    }

    #[test]
    fn test_undefined_score_has_no_class() {
        assert_eq!(classify(None, &ClassThresholds::default()), None);
    }

    #[test]
    fn test_class_ordering_follows_wetness() {
        assert!(AnomalyClass::ExtremelyDry < AnomalyClass::Dry);
        assert!(AnomalyClass::Normal < AnomalyClass::Wet);
        assert_eq!(AnomalyClass::ExtremelyDry.to_string(), "extremely dry");
    }

    #[test]
    fn test_dry_spell_detected() {
        let scores = vec![
            score("A", 1, Some(0.3)),
            score("A", 2, Some(-1.2)),
            score("A", 3, Some(-2.4)),
            score("A", 4, Some(-1.0)),
            score("A", 5, Some(0.1)),
        ];
        let spells = detect_dry_spells(&scores, 1.0, 3);
        assert_eq!(spells.len(), 1);
        assert_eq!(spells[0].start, "2022-07-02");
        assert_eq!(spells[0].end, "2022-07-04");
        assert_eq!(spells[0].length, 3);
        assert_eq!(spells[0].peak, -2.4);
    }

    #[test]
    fn test_short_runs_and_undefined_scores_break_spells() {
        let scores = vec![
            score("A", 1, Some(-1.5)),
            score("A", 2, Some(-1.5)),
            score("A", 3, None),
            score("A", 4, Some(-1.5)),
            score("B", 1, Some(-1.5)),
        ];
        assert!(detect_dry_spells(&scores, 1.0, 3).is_empty());
        assert_eq!(detect_dry_spells(&scores, 1.0, 2).len(), 1);
    }

    #[test]
    fn test_spells_do_not_cross_sites() {
        let scores = vec![
            score("A", 1, Some(-1.5)),
            score("B", 2, Some(-1.5)),
            score("A", 3, Some(-1.5)),
            score("B", 4, Some(-1.5)),
        ];
        let spells = detect_dry_spells(&scores, 1.0, 2);
        assert_eq!(spells.len(), 2);
        assert!(spells.iter().all(|s| s.length == 2));
    }
}
