//! Backscatter cube: a dense `time × lat × lon` grid of dB values.
//!
//! Cubes are built from long-format observation rows (one row per pixel and
//! acquisition). Cells with no row are NaN. Averaging is done in linear power
//! and converted back to dB, since a mean of dB values is a geometric mean.

use chrono::{DateTime, Utc};
use log::debug;
use ndarray::{Array2, Array3, Axis, s};

use crate::model::{AnalysisError, Observation};

/// Converts backscatter from dB to linear power.
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Converts linear power to dB. Non-positive power has no dB value (NaN).
pub fn linear_to_db(linear: f64) -> f64 {
    if linear > 0.0 {
        10.0 * linear.log10()
    } else {
        f64::NAN
    }
}

#[derive(Debug, Clone)]
pub struct BackscatterCube {
    pub channel: String,
    pub times: Vec<DateTime<Utc>>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// dB values, indexed `[time, lat, lon]`.
    pub data: Array3<f64>,
}

impl BackscatterCube {
    /// Builds a cube from rows whose channel matches `channel` (case-insensitive).
    ///
    /// Coordinates are the sorted distinct values found in the rows. When two
    /// rows land in the same cell the later one wins.
    pub fn from_observations(
        observations: &[Observation],
        channel: &str,
    ) -> Result<Self, AnalysisError> {
        let mut rows = Vec::new();
        for (index, obs) in observations.iter().enumerate() {
            let matches = obs
                .channel
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(channel));
            if !matches {
                continue;
            }
            let time = obs.parsed_time().map_err(|_| AnalysisError::InvalidTimestamp {
                index,
                value: obs.timestamp.clone(),
            })?;
            rows.push((time, obs));
        }
        if rows.is_empty() {
            return Err(AnalysisError::NoCubeData(channel.to_string()));
        }

        let mut times: Vec<DateTime<Utc>> = rows.iter().map(|(t, _)| *t).collect();
        times.sort();
        times.dedup();
        let latitudes = sorted_distinct(rows.iter().map(|(_, o)| o.latitude));
        let longitudes = sorted_distinct(rows.iter().map(|(_, o)| o.longitude));

        let mut data = Array3::from_elem((times.len(), latitudes.len(), longitudes.len()), f64::NAN);
        for (time, obs) in &rows {
            // every coordinate was collected from these rows, so lookups succeed
            let (Some(t), Some(y), Some(x)) = (
                times.binary_search(time).ok(),
                position(&latitudes, obs.latitude),
                position(&longitudes, obs.longitude),
            ) else {
                continue;
            };
            data[[t, y, x]] = obs.valid_value().unwrap_or(f64::NAN);
        }

        debug!(
            "built {} cube: {} times x {} lats x {} lons",
            channel,
            times.len(),
            latitudes.len(),
            longitudes.len()
        );

        Ok(BackscatterCube {
            channel: channel.to_string(),
            times,
            latitudes,
            longitudes,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Per-pixel temporal mean in dB, averaged in linear power.
    ///
    /// Pixels with no data at any time are NaN.
    pub fn mean_over_time(&self) -> Array2<f64> {
        self.reduce_time(|values| {
            let linear: Vec<f64> = values.iter().map(|v| db_to_linear(*v)).collect();
            crate::analysis::stats::mean(&linear).map(linear_to_db)
        })
    }

    /// Per-pixel temporal sample standard deviation, in dB.
    pub fn std_over_time(&self) -> Array2<f64> {
        self.reduce_time(crate::analysis::stats::sample_std_dev)
    }

    /// Spatial mean of every time slice, averaged in linear power.
    ///
    /// Slices with no finite cell yield NaN.
    pub fn spatial_mean_series(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.data
            .axis_iter(Axis(0))
            .zip(&self.times)
            .map(|(slice, time)| {
                let linear: Vec<f64> = slice
                    .iter()
                    .filter(|v| v.is_finite())
                    .map(|v| db_to_linear(*v))
                    .collect();
                let mean = crate::analysis::stats::mean(&linear)
                    .map(linear_to_db)
                    .unwrap_or(f64::NAN);
                (*time, mean)
            })
            .collect()
    }

    /// Sub-cube of acquisitions with `start <= time < end`.
    ///
    /// The result may have zero time steps.
    pub fn select_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let lo = self.times.partition_point(|t| *t < start);
        let hi = self.times.partition_point(|t| *t < end).max(lo);
        BackscatterCube {
            channel: self.channel.clone(),
            times: self.times[lo..hi].to_vec(),
            latitudes: self.latitudes.clone(),
            longitudes: self.longitudes.clone(),
            data: self.data.slice(s![lo..hi, .., ..]).to_owned(),
        }
    }

    fn reduce_time<F>(&self, reducer: F) -> Array2<f64>
    where
        F: Fn(&[f64]) -> Option<f64>,
    {
        let (_, ny, nx) = self.shape();
        Array2::from_shape_fn((ny, nx), |(y, x)| {
            let values: Vec<f64> = self
                .data
                .slice(s![.., y, x])
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            reducer(&values).unwrap_or(f64::NAN)
        })
    }
}

fn sorted_distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

fn position(coords: &[f64], value: f64) -> Option<usize> {
    coords.binary_search_by(|c| c.total_cmp(&value)).ok()
}
