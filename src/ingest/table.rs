/// Table parsers for soil-moisture and backscatter datasets.
///
/// Two layouts are supported:
/// - delimited tables with a header row (CSV, semicolon-separated...),
///   mapped onto `Observation` fields through a `ColumnMapping`;
/// - whitespace-separated station files with one measurement per line:
///   `YYYY/MM/DD HH:MM value flag...`
///
/// Malformed rows are skipped and counted, never fatal. A missing required
/// column is fatal.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::config::ColumnMapping;
use crate::model::{IngestError, MISSING_SENTINEL, Observation};

/// Observations parsed from one dataset plus the count of rows dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub observations: Vec<Observation>,
    pub skipped_rows: usize,
}

/// Parses a numeric cell. `Ok(None)` for the missing-value markers
/// ("", "nan", "NA", "null", -9999); `Err` for anything else non-numeric.
pub fn parse_value(raw: &str) -> Result<Option<f64>, String> {
    let s = raw.trim();
    if s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    let v: f64 = s.parse().map_err(|_| format!("not a number: '{}'", s))?;
    if v == MISSING_SENTINEL || !v.is_finite() {
        Ok(None)
    } else {
        Ok(Some(v))
    }
}

struct ColumnIndex {
    time: usize,
    site: Option<usize>,
    value: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
    channel: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, mapping: &ColumnMapping, has_default_site: bool) -> Result<Self, IngestError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| IngestError::Parse(format!("missing column '{}'", name)))
        };

        let site = find(&mapping.site);
        if site.is_none() && !has_default_site {
            return Err(IngestError::Parse(format!("missing column '{}'", mapping.site)));
        }

        Ok(ColumnIndex {
            time: require(&mapping.time)?,
            site,
            value: require(&mapping.value)?,
            latitude: mapping.latitude.as_deref().and_then(find),
            longitude: mapping.longitude.as_deref().and_then(find),
            channel: mapping.channel.as_deref().and_then(find),
        })
    }
}

/// Parses a delimited table with a header row.
///
/// `default_site` names the site when the table has no site column. Coordinate
/// and channel columns are optional; absent coordinates are NaN.
pub fn parse_observation_csv(
    text: &str,
    mapping: &ColumnMapping,
    delimiter: u8,
    default_site: Option<&str>,
) -> Result<ParsedTable, IngestError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers, mapping, default_site.is_some())?;

    let mut table = ParsedTable::default();
    for record in reader.records() {
        let Ok(record) = record else {
            table.skipped_rows += 1;
            continue;
        };
        match observation_from_record(&record, &columns, default_site) {
            Some(obs) => table.observations.push(obs),
            None => table.skipped_rows += 1,
        }
    }

    Ok(table)
}

fn observation_from_record(
    record: &StringRecord,
    columns: &ColumnIndex,
    default_site: Option<&str>,
) -> Option<Observation> {
    let cell = |i: usize| record.get(i).map(str::trim).filter(|s| !s.is_empty());
    let coord = |i: Option<usize>| {
        i.and_then(cell)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    };

    let site_name = columns.site.and_then(cell).or(default_site)?.to_string();
    let timestamp = cell(columns.time)?.to_string();
    let value = parse_value(record.get(columns.value).unwrap_or("")).ok()?;

    Some(Observation {
        site_name,
        timestamp,
        latitude: coord(columns.latitude),
        longitude: coord(columns.longitude),
        value,
        channel: columns.channel.and_then(cell).map(String::from),
    })
}

/// Parses a whitespace-separated station file for a single site.
///
/// Lines not starting with a digit are treated as headers. Columns after the
/// value (quality flags) are ignored.
pub fn parse_station_file(
    text: &str,
    site_name: &str,
    latitude: f64,
    longitude: f64,
    channel: Option<&str>,
) -> ParsedTable {
    let mut table = ParsedTable::default();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 3 {
            table.skipped_rows += 1;
            continue;
        }

        let Ok(value) = parse_value(fields[2]) else {
            table.skipped_rows += 1;
            continue;
        };

        table.observations.push(Observation {
            site_name: site_name.to_string(),
            timestamp: format!("{} {}", fields[0], fields[1]),
            latitude,
            longitude,
            value,
            channel: channel.map(String::from),
        });
    }

    table
}

// ============================================================================
// Tests
// ============================================================================
