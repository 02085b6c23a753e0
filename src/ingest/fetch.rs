/// Dataset retrieval: blocking HTTP fetches and local file reads.
///
/// Course datasets are static files published under fixed URLs. A failed
/// fetch is surfaced to the caller as-is; nothing is retried or cached.

use std::time::Duration;

use crate::config::{DatasetConfig, DatasetFormat, DatasetSource};
use crate::ingest::table::{ParsedTable, parse_observation_csv, parse_station_file};
use crate::logging::{self, DataSource};
use crate::model::IngestError;

/// Per-request timeout for remote datasets.
pub const FETCH_TIMEOUT_SECS: u64 = 60;

/// Builds the HTTP client shared by all fetches of one run.
pub fn build_client() -> Result<reqwest::blocking::Client, IngestError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(concat!("soilmon_analysis/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fetches a URL as text. Non-2xx responses become `IngestError::Http`.
pub fn fetch_text(client: &reqwest::blocking::Client, url: &str) -> Result<String, IngestError> {
    logging::debug(DataSource::Http, Some(url), "GET");

    let response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(IngestError::Http(response.status().as_u16()));
    }

    Ok(response.text()?)
}

/// Reads a dataset's raw text from a URL or a local path.
pub fn load_source(
    client: &reqwest::blocking::Client,
    source: &DatasetSource,
) -> Result<String, IngestError> {
    match source {
        DatasetSource::Url(url) => fetch_text(client, url),
        DatasetSource::Path(path) => Ok(std::fs::read_to_string(path)?),
    }
}

/// Parses raw dataset text according to the dataset's configured layout.
pub fn parse_dataset(dataset: &DatasetConfig, text: &str) -> Result<ParsedTable, IngestError> {
    let table = match dataset.format {
        DatasetFormat::Csv => {
            let delimiter = u8::try_from(dataset.delimiter).map_err(|_| {
                IngestError::Parse(format!("non-ASCII delimiter '{}'", dataset.delimiter))
            })?;
            parse_observation_csv(text, &dataset.columns, delimiter, dataset.site.as_deref())?
        }
        DatasetFormat::Station => {
            let site = dataset.site.as_deref().ok_or_else(|| {
                IngestError::Parse(format!("station dataset '{}' has no site", dataset.name))
            })?;
            parse_station_file(
                text,
                site,
                dataset.latitude.unwrap_or(f64::NAN),
                dataset.longitude.unwrap_or(f64::NAN),
                dataset.channel.as_deref(),
            )
        }
    };

    if table.observations.is_empty() {
        return Err(IngestError::NoData(dataset.name.clone()));
    }
    Ok(table)
}

/// Loads and parses one configured dataset.
pub fn load_dataset(
    client: &reqwest::blocking::Client,
    dataset: &DatasetConfig,
) -> Result<ParsedTable, IngestError> {
    let source = dataset
        .source()
        .map_err(|e| IngestError::Parse(e.to_string()))?;
    let text = load_source(client, &source)?;
    let table = parse_dataset(dataset, &text)?;

    let tag = match dataset.format {
        DatasetFormat::Csv => DataSource::Csv,
        DatasetFormat::Station => DataSource::Station,
    };
    logging::info(
        tag,
        Some(&dataset.name),
        &format!(
            "loaded {} observations ({} rows skipped)",
            table.observations.len(),
            table.skipped_rows
        ),
    );
    if table.skipped_rows > 0 {
        logging::warn(
            tag,
            Some(&dataset.name),
            &format!("{} malformed rows skipped", table.skipped_rows),
        );
    }

    Ok(table)
}
