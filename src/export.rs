//! Tabular export of analysis results for plotting tools.
//!
//! Scores and summaries go out as CSV, the full report as pretty JSON.
//! Backscatter cubes are flattened to a per-pixel grid and a per-acquisition
//! series. Undefined numbers are written as empty CSV cells and JSON `null`.

use std::io::Write;

use serde::Serialize;

use crate::analysis::aggregate::SiteSummary;
use crate::cube::BackscatterCube;
use crate::pipeline::{AnalysisReport, ScoredObservation};

#[derive(Serialize)]
struct ScoreRow<'a> {
    site: &'a str,
    channel: Option<&'a str>,
    time: &'a str,
    month: u32,
    value: Option<f64>,
    z_score: Option<f64>,
    class: Option<String>,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    site: &'a str,
    count: usize,
    missing: usize,
    mean: Option<f64>,
    std_dev: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    first: Option<String>,
    last: Option<String>,
}

/// Writes one CSV row per scored observation.
pub fn write_scores_csv<W: Write>(writer: W, scored: &[ScoredObservation]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for s in scored {
        out.serialize(ScoreRow {
            site: &s.site_name,
            channel: s.channel.as_deref(),
            time: &s.timestamp,
            month: s.month,
            value: s.value,
            z_score: s.score,
            class: s.class.map(|c| c.to_string()),
        })?;
    }
    out.flush()?;
    Ok(())
}

/// Writes one CSV row per site summary.
pub fn write_summaries_csv<W: Write>(writer: W, summaries: &[SiteSummary]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for s in summaries {
        out.serialize(SummaryRow {
            site: &s.site_name,
            count: s.count,
            missing: s.missing,
            mean: s.mean,
            std_dev: s.std_dev,
            min: s.min,
            max: s.max,
            first: s.first.map(|t| t.to_rfc3339()),
            last: s.last.map(|t| t.to_rfc3339()),
        })?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the report (without per-observation scores) as pretty JSON.
pub fn write_report_json<W: Write>(writer: W, report: &AnalysisReport) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(writer, report)
}

#[derive(Serialize)]
struct PixelRow {
    latitude: f64,
    longitude: f64,
    mean_db: Option<f64>,
    std_db: Option<f64>,
}

#[derive(Serialize)]
struct AcquisitionRow {
    time: String,
    mean_db: Option<f64>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Writes the cube's temporal mean and std, one row per pixel.
pub fn write_cube_pixels_csv<W: Write>(writer: W, cube: &BackscatterCube) -> Result<(), csv::Error> {
    let mean = cube.mean_over_time();
    let std = cube.std_over_time();
    let mut out = csv::Writer::from_writer(writer);
    for ((y, x), m) in mean.indexed_iter() {
        out.serialize(PixelRow {
            latitude: cube.latitudes[y],
            longitude: cube.longitudes[x],
            mean_db: finite(*m),
            std_db: finite(std[[y, x]]),
        })?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the cube's spatial mean, one row per acquisition.
pub fn write_cube_series_csv<W: Write>(writer: W, cube: &BackscatterCube) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for (time, mean) in cube.spatial_mean_series() {
        out.serialize(AcquisitionRow {
            time: time.to_rfc3339(),
            mean_db: finite(mean),
        })?;
    }
    out.flush()?;
    Ok(())
}
