/// Tabular reductions and filters for loaded observation tables.
///
/// Filters return new vectors and leave the input untouched. Gridded
/// reductions over backscatter cubes live in `crate::cube`.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::analysis::groupings::{group_by_site, Series};
use crate::analysis::stats;
use crate::model::Observation;

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Descriptive statistics for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub site_name: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// Mean value of one calendar month of one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub year: i32,
    pub month: u32,
    pub count: usize,
    pub mean: f64,
}

/// Per-site summary statistics, sorted by site name.
///
/// `first` / `last` cover rows whose timestamp parses; rows with a bad
/// timestamp still count toward the value statistics.
pub fn summarize_by_site(observations: &[Observation]) -> Vec<SiteSummary> {
    group_by_site(observations)
        .into_iter()
        .map(|(site_name, members)| {
            let values: Vec<f64> = members.iter().filter_map(|o| o.valid_value()).collect();
            let times: Vec<DateTime<Utc>> =
                members.iter().filter_map(|o| o.parsed_time().ok()).collect();
            let (min, max) = match stats::min_max(&values) {
                Some((lo, hi)) => (Some(lo), Some(hi)),
                None => (None, None),
            };
            SiteSummary {
                count: values.len(),
                missing: members.len() - values.len(),
                mean: stats::mean(&values),
                std_dev: stats::sample_std_dev(&values),
                min,
                max,
                first: times.iter().min().copied(),
                last: times.iter().max().copied(),
                site_name,
            }
        })
        .collect()
}

/// Resamples a series to monthly means. Months with no usable value are omitted.
pub fn monthly_means(series: &Series) -> Vec<MonthlyMean> {
    let mut buckets: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for (time, obs) in series.iter() {
        if let Some(v) = obs.valid_value() {
            buckets.entry((time.year(), time.month())).or_default().push(v);
        }
    }
    buckets
        .into_iter()
        .filter_map(|((year, month), values)| {
            stats::mean(&values).map(|mean| MonthlyMean {
                year,
                month,
                count: values.len(),
                mean,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Rows whose channel label equals `channel` (case-insensitive).
pub fn filter_channel(observations: &[Observation], channel: &str) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| {
            o.channel
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(channel))
        })
        .cloned()
        .collect()
}

/// Rows with `start <= time < end`. Rows with unparseable timestamps are dropped.
pub fn filter_time_range(
    observations: &[Observation],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| {
            o.parsed_time()
                .map(|t| t >= start && t < end)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Rows belonging to any of `sites`.
pub fn filter_sites(observations: &[Observation], sites: &[&str]) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| sites.contains(&o.site_name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn obs(site: &str, timestamp: &str, value: Option<f64>, channel: Option<&str>) -> Observation {
        Observation {
            site_name: site.to_string(),
            timestamp: timestamp.to_string(),
            latitude: 47.0,
            longitude: 15.0,
            value,
            channel: channel.map(String::from),
        }
    }

    #[test]
    fn test_summary_counts_missing_separately() {
        let input = vec![
            obs("Kreuzen", "2020-01-01", Some(20.0), None),
            obs("Kreuzen", "2020-01-02", None, None),
            obs("Kreuzen", "2020-01-03", Some(40.0), None),
            obs("Ehrenhof", "2020-01-01", Some(5.0), None),
        ];
        let summaries = summarize_by_site(&input);
        assert_eq!(summaries.len(), 2);

        let k = summaries.iter().find(|s| s.site_name == "Kreuzen").unwrap();
        assert_eq!(k.count, 2);
        assert_eq!(k.missing, 1);
        assert_eq!(k.mean, Some(30.0));
        assert_eq!(k.min, Some(20.0));
        assert_eq!(k.max, Some(40.0));
        assert_eq!(k.first, Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(k.last, Some(Utc.with_ymd_and_hms(2020, 1, 3, 0, 0, 0).unwrap()));

        let e = summaries.iter().find(|s| s.site_name == "Ehrenhof").unwrap();
        assert_eq!(e.std_dev, None);
    }

    #[test]
    fn test_monthly_means_resample() {
        let input = vec![
            obs("A", "2020-01-01", Some(10.0), None),
            obs("A", "2020-01-15", Some(20.0), None),
            obs("A", "2020-02-01", None, None),
            obs("A", "2021-01-01", Some(5.0), None),
        ];
        let series = Series::from_observations("A", &input).unwrap();
        let monthly = monthly_means(&series);
        assert_eq!(monthly.len(), 2, "February has no usable values");
        assert_eq!((monthly[0].year, monthly[0].month), (2020, 1));
        assert_relative_eq!(monthly[0].mean, 15.0);
        assert_eq!(monthly[1].count, 1);
    }

    #[test]
    fn test_filter_channel_is_case_insensitive() {
        let input = vec![
            obs("A", "2020-01-01", Some(-12.0), Some("VV")),
            obs("A", "2020-01-01", Some(-18.0), Some("vh")),
            obs("A", "2020-01-01", Some(30.0), None),
        ];
        assert_eq!(filter_channel(&input, "VH").len(), 1);
        assert_eq!(filter_channel(&input, "vv")[0].value, Some(-12.0));
    }

    #[test]
    fn test_filter_time_range_is_half_open() {
        let input = vec![
            obs("A", "2020-01-01", Some(1.0), None),
            obs("A", "2020-02-01", Some(2.0), None),
            obs("A", "garbage", Some(3.0), None),
        ];
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        let kept = filter_time_range(&input, start, end);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value, Some(1.0));
    }

    #[test]
    fn test_filter_sites() {
        let input = vec![
            obs("A", "2020-01-01", Some(1.0), None),
            obs("B", "2020-01-01", Some(2.0), None),
            obs("C", "2020-01-01", Some(3.0), None),
        ];
        let kept = filter_sites(&input, &["A", "C"]);
        assert_eq!(kept.len(), 2);
        assert_eq!(input.len(), 3);
    }
}
