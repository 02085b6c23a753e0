//! Seasonal anomaly (z-score) transform.
//!
//! Observations are partitioned by calendar month and site, and each value is
//! standardized against its own group's mean and sample standard deviation.
//! Years are folded together on purpose: all Januaries of a site form the
//! January climatology baseline that drought anomalies are measured against.
//!
//! Undefined scores are `None`. A score is undefined when the observation has
//! no usable value, its group has fewer than two usable values, or the group's
//! standard deviation is exactly zero.

use std::collections::BTreeMap;

use log::debug;

use crate::analysis::groupings::{group_by_key, group_keys};
use crate::analysis::stats;
use crate::model::{AnalysisError, AnomalyScore, GroupKey, GroupStats, Observation};

/// Per-(month, site) mean and sample standard deviation.
///
/// Missing values are excluded from the statistics. Every key present in
/// the input appears in the result, even if all its values are missing.
pub fn monthly_climatology(
    observations: &[Observation],
) -> Result<BTreeMap<GroupKey, GroupStats>, AnalysisError> {
    if observations.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "climatology needs at least one observation".to_string(),
        ));
    }

    let groups = group_by_key(observations)?;
    let climatology = groups
        .into_iter()
        .map(|(key, members)| {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|&i| observations[i].valid_value())
                .collect();
            let group = GroupStats {
                count: values.len(),
                mean: stats::mean(&values),
                std_dev: stats::sample_std_dev(&values),
            };
            (key, group)
        })
        .collect();

    Ok(climatology)
}

/// Standardized anomaly of every observation relative to its own
/// (month, site) group.
///
/// Output is parallel to the input: `scores[i].index == i`.
pub fn seasonal_anomalies(
    observations: &[Observation],
) -> Result<Vec<AnomalyScore>, AnalysisError> {
    let baseline = monthly_climatology(observations)?;
    anomalies_against(observations, &baseline)
}

/// Scores observations against a previously computed climatology.
///
/// Useful when the baseline comes from a reference period and the scored
/// observations from another. Observations whose group is absent from the
/// baseline get an undefined score.
pub fn anomalies_against(
    observations: &[Observation],
    baseline: &BTreeMap<GroupKey, GroupStats>,
) -> Result<Vec<AnomalyScore>, AnalysisError> {
    if observations.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "anomaly transform needs at least one observation".to_string(),
        ));
    }

    let keys = group_keys(observations)?;
    let mut undefined = 0usize;

    let scores: Vec<AnomalyScore> = observations
        .iter()
        .zip(keys)
        .enumerate()
        .map(|(index, (obs, key))| {
            let score = match (obs.valid_value(), baseline.get(&key)) {
                (Some(value), Some(group)) => stats::z_score(value, group.mean, group.std_dev),
                _ => None,
            };
            if score.is_none() {
                undefined += 1;
            }
            AnomalyScore {
                index,
                site_name: obs.site_name.clone(),
                timestamp: obs.timestamp.clone(),
                month: key.month,
                score,
            }
        })
        .collect();

    debug!(
        "anomaly transform: {} observations, {} undefined scores",
        scores.len(),
        undefined
    );

    Ok(scores)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(site: &str, timestamp: &str, value: Option<f64>) -> Observation {
        Observation {
            site_name: site.to_string(),
            timestamp: timestamp.to_string(),
            latitude: 47.9,
            longitude: 16.1,
            value,
            channel: None,
        }
    }

    fn scores_of(result: &[AnomalyScore]) -> Vec<Option<f64>> {
        result.iter().map(|s| s.score).collect()
    }

    #[test]
    fn test_three_january_values_score_minus_one_zero_one() {
        let input = vec![
            obs("A", "2015-01-10", Some(10.0)),
            obs("A", "2016-01-10", Some(20.0)),
            obs("A", "2017-01-10", Some(30.0)),
        ];
        let result = seasonal_anomalies(&input).unwrap();
        let expected = [-1.0, 0.0, 1.0];
        for (score, want) in result.iter().zip(expected) {
            assert_relative_eq!(score.score.unwrap(), want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_observation_is_undefined() {
        let result = seasonal_anomalies(&[obs("B", "2019-06-01", Some(5.0))]).unwrap();
        assert_eq!(scores_of(&result), vec![None]);
        assert_eq!(result[0].month, 6);
    }

    #[test]
    fn test_zero_variance_group_is_undefined_not_infinite() {
        let input = vec![
            obs("A", "2015-03-01", Some(7.0)),
            obs("A", "2016-03-01", Some(7.0)),
            obs("A", "2017-03-01", Some(7.0)),
        ];
        let result = seasonal_anomalies(&input).unwrap();
        assert!(result.iter().all(|s| s.score.is_none()));
    }

    #[test]
    fn test_identical_inexact_values_are_undefined() {
        for v in [0.1, 0.7] {
            let input = vec![
                obs("A", "2015-01-01", Some(v)),
                obs("A", "2016-01-01", Some(v)),
                obs("A", "2017-01-01", Some(v)),
            ];
            let result = seasonal_anomalies(&input).unwrap();
            assert_eq!(scores_of(&result), vec![None, None, None], "value {}", v);
        }
    }

    #[test]
    fn test_missing_values_excluded_but_still_scored_undefined() {
        let input = vec![
            obs("A", "2015-01-10", Some(10.0)),
            obs("A", "2016-01-10", None),
            obs("A", "2017-01-10", Some(30.0)),
            obs("A", "2018-01-10", Some(f64::NAN)),
        ];
        let result = seasonal_anomalies(&input).unwrap();
        // mean 20, sample std of [10, 30] = 14.142...
        let sd = 200f64.sqrt();
        assert_relative_eq!(result[0].score.unwrap(), -10.0 / sd, epsilon = 1e-12);
        assert_eq!(result[1].score, None);
        assert_relative_eq!(result[2].score.unwrap(), 10.0 / sd, epsilon = 1e-12);
        assert_eq!(result[3].score, None);
    }

    #[test]
    fn test_group_with_one_valid_value_among_missing_is_undefined() {
        let input = vec![
            obs("A", "2015-05-10", Some(10.0)),
            obs("A", "2016-05-10", None),
        ];
        let result = seasonal_anomalies(&input).unwrap();
        assert_eq!(scores_of(&result), vec![None, None]);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = seasonal_anomalies(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));
    }

    #[test]
    fn test_unparseable_timestamp_is_an_error() {
        let input = vec![obs("A", "2015-01-10", Some(1.0)), obs("A", "Jan 2016", Some(2.0))];
        let err = seasonal_anomalies(&input).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidTimestamp { index: 1, .. }));
    }

    #[test]
    fn test_groups_standardize_to_zero_mean_unit_std() {
        let values = [12.0, 18.5, 25.0, 31.0, 9.5, 22.0];
        let input: Vec<Observation> = values
            .iter()
            .enumerate()
            .map(|(i, v)| obs("A", &format!("{}-08-01", 2010 + i), Some(*v)))
            .collect();
        let result = seasonal_anomalies(&input).unwrap();
        let z: Vec<f64> = result.iter().map(|s| s.score.unwrap()).collect();
        assert_relative_eq!(stats::mean(&z).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats::sample_std_dev(&z).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_site_offset_is_removed() {
        let base = [30.0, 42.0, 55.0, 38.0];
        let mut input = Vec::new();
        for (i, v) in base.iter().enumerate() {
            input.push(obs("A", &format!("{}-04-01", 2000 + i), Some(*v)));
            input.push(obs("B", &format!("{}-04-01", 2000 + i), Some(*v + 25.0)));
        }
        let result = seasonal_anomalies(&input).unwrap();
        let a: Vec<f64> = result.iter().filter(|s| s.site_name == "A").map(|s| s.score.unwrap()).collect();
        let b: Vec<f64> = result.iter().filter(|s| s.site_name == "B").map(|s| s.score.unwrap()).collect();
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transform_is_idempotent_and_does_not_mutate_input() {
        let input = vec![
            obs("A", "2015-01-10", Some(10.0)),
            obs("A", "2016-01-10", Some(20.0)),
            obs("A", "2016-02-10", Some(20.0)),
        ];
        let snapshot = input.clone();
        let first = seasonal_anomalies(&input).unwrap();
        let second = seasonal_anomalies(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_output_is_parallel_to_input() {
        let input = vec![
            obs("B", "2015-07-10", Some(1.0)),
            obs("A", "2015-01-10", Some(2.0)),
            obs("B", "2016-07-10", Some(3.0)),
        ];
        let result = seasonal_anomalies(&input).unwrap();
        for (i, (score, o)) in result.iter().zip(&input).enumerate() {
            assert_eq!(score.index, i);
            assert_eq!(score.site_name, o.site_name);
            assert_eq!(score.timestamp, o.timestamp);
        }
    }

    #[test]
    fn test_anomalies_against_reference_baseline() {
        let reference = vec![
            obs("A", "2000-01-10", Some(10.0)),
            obs("A", "2001-01-10", Some(30.0)),
        ];
        let baseline = monthly_climatology(&reference).unwrap();
        let current = vec![
            obs("A", "2021-01-10", Some(20.0)),
            obs("A", "2021-02-10", Some(20.0)), // no February baseline
        ];
        let result = anomalies_against(&current, &baseline).unwrap();
        assert_relative_eq!(result[0].score.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(result[1].score, None);
    }

    #[test]
    fn test_climatology_counts_only_valid_values() {
        let input = vec![
            obs("A", "2015-01-10", Some(10.0)),
            obs("A", "2016-01-10", None),
        ];
        let clim = monthly_climatology(&input).unwrap();
        let jan = &clim[&GroupKey { month: 1, site_name: "A".to_string() }];
        assert_eq!(jan.count, 1);
        assert_eq!(jan.mean, Some(10.0));
        assert_eq!(jan.std_dev, None);
    }
}
