/// Partitioning helpers: per-site buckets, (month, site) group keys, and
/// time-sorted series.
///
/// Everything here borrows or indexes into the caller's observations; nothing
/// is copied out of the loaded table except inside `Series`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::model::{AnalysisError, GroupKey, Observation};

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Observations of a single site, ordered by time.
///
/// Timestamps are non-decreasing; equal timestamps keep their input order.
#[derive(Debug, Clone)]
pub struct Series {
    pub site_name: String,
    points: Vec<(DateTime<Utc>, Observation)>,
}

impl Series {
    /// Builds a series, parsing and sorting every observation.
    ///
    /// Fails on an unparseable timestamp or an observation from another site.
    pub fn from_observations(
        site_name: &str,
        observations: &[Observation],
    ) -> Result<Self, AnalysisError> {
        let mut points = Vec::with_capacity(observations.len());
        for (index, obs) in observations.iter().enumerate() {
            if obs.site_name != site_name {
                return Err(AnalysisError::MixedSites {
                    expected: site_name.to_string(),
                    found: obs.site_name.clone(),
                });
            }
            points.push((parse_at(index, obs)?, obs.clone()));
        }
        Ok(Series::from_points(site_name, points))
    }

    fn from_points(site_name: &str, mut points: Vec<(DateTime<Utc>, Observation)>) -> Self {
        // sort_by_key is stable
        points.sort_by_key(|(time, _)| *time);
        Series {
            site_name: site_name.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Observation)> {
        self.points.iter().map(|(t, o)| (t, o))
    }

    pub fn times(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.points.iter().map(|(t, _)| t)
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|(t, _)| *t)
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|(t, _)| *t)
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Buckets observations by site name. Site order is alphabetical.
pub fn group_by_site(observations: &[Observation]) -> BTreeMap<String, Vec<&Observation>> {
    let mut groups: BTreeMap<String, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        groups.entry(obs.site_name.clone()).or_default().push(obs);
    }
    groups
}

/// Partitions observation indices by (calendar month, site).
///
/// Every index appears in exactly one group. Fails on the first timestamp
/// that cannot be parsed.
pub fn group_by_key(
    observations: &[Observation],
) -> Result<BTreeMap<GroupKey, Vec<usize>>, AnalysisError> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (index, key) in group_keys(observations)?.into_iter().enumerate() {
        groups.entry(key).or_default().push(index);
    }
    Ok(groups)
}

/// The group key of every observation, in input order.
pub fn group_keys(observations: &[Observation]) -> Result<Vec<GroupKey>, AnalysisError> {
    observations
        .iter()
        .enumerate()
        .map(|(index, obs)| parse_at(index, obs).map(|t| GroupKey::for_time(&t, &obs.site_name)))
        .collect()
}

/// Splits a mixed table into one time-sorted series per site.
///
/// A bad timestamp is reported at its position in `observations`.
pub fn into_series(observations: &[Observation]) -> Result<Vec<Series>, AnalysisError> {
    let mut by_site: BTreeMap<&str, Vec<(DateTime<Utc>, Observation)>> = BTreeMap::new();
    for (index, obs) in observations.iter().enumerate() {
        let time = parse_at(index, obs)?;
        by_site
            .entry(obs.site_name.as_str())
            .or_default()
            .push((time, obs.clone()));
    }
    Ok(by_site
        .into_iter()
        .map(|(site, points)| Series::from_points(site, points))
        .collect())
}

fn parse_at(index: usize, obs: &Observation) -> Result<DateTime<Utc>, AnalysisError> {
    obs.parsed_time().map_err(|_| AnalysisError::InvalidTimestamp {
        index,
        value: obs.timestamp.clone(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(site: &str, timestamp: &str, value: f64) -> Observation {
        Observation {
            site_name: site.to_string(),
            timestamp: timestamp.to_string(),
            latitude: 48.2,
            longitude: 16.4,
            value: Some(value),
            channel: None,
        }
    }

    #[test]
    fn test_series_is_sorted_by_time() {
        let input = vec![
            obs("Grafendorf", "2020-03-01", 3.0),
            obs("Grafendorf", "2020-01-01", 1.0),
            obs("Grafendorf", "2020-02-01", 2.0),
        ];
        let series = Series::from_observations("Grafendorf", &input).unwrap();
        let values: Vec<f64> = series.iter().map(|(_, o)| o.value.unwrap()).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        let times: Vec<_> = series.times().collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_series_keeps_input_order_for_equal_timestamps() {
        let input = vec![
            obs("A", "2020-01-01", 1.0),
            obs("A", "2020-01-01", 2.0),
        ];
        let series = Series::from_observations("A", &input).unwrap();
        let values: Vec<f64> = series.iter().map(|(_, o)| o.value.unwrap()).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_series_rejects_foreign_site() {
        let input = vec![obs("A", "2020-01-01", 1.0), obs("B", "2020-01-02", 2.0)];
        let err = Series::from_observations("A", &input).unwrap_err();
        assert!(matches!(err, AnalysisError::MixedSites { .. }));
    }

    #[test]
    fn test_group_by_key_folds_years_together() {
        let input = vec![
            obs("A", "2018-01-15", 1.0),
            obs("A", "2019-01-20", 2.0),
            obs("A", "2019-02-01", 3.0),
            obs("B", "2019-01-20", 4.0),
        ];
        let groups = group_by_key(&input).unwrap();
        assert_eq!(groups.len(), 3);
        let jan_a = GroupKey { month: 1, site_name: "A".to_string() };
        assert_eq!(groups[&jan_a], vec![0, 1]);

        let total: usize = groups.values().map(|v| v.len()).sum();
        assert_eq!(total, input.len(), "every observation belongs to exactly one group");
    }

    #[test]
    fn test_group_by_key_reports_bad_timestamp_index() {
        let input = vec![obs("A", "2018-01-15", 1.0), obs("A", "yesterday", 2.0)];
        let err = group_by_key(&input).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidTimestamp { index: 1, value: "yesterday".to_string() }
        );
    }

    #[test]
    fn test_into_series_one_per_site() {
        let input = vec![
            obs("B", "2020-01-02", 1.0),
            obs("A", "2020-01-01", 2.0),
            obs("B", "2020-01-01", 3.0),
        ];
        let series = into_series(&input).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].site_name, "A");
        assert_eq!(series[1].len(), 2);
    }

    #[test]
    fn test_into_series_reports_input_position_of_bad_timestamp() {
        let input = vec![
            obs("A", "2020-01-01", 1.0),
            obs("B", "2020-01-01", 2.0),
            obs("A", "not a date", 3.0),
        ];
        let err = into_series(&input).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidTimestamp { index: 2, value: "not a date".to_string() }
        );
    }
}
