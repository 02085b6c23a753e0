/// Dataset loading.
///
/// Submodules:
/// - `table` — CSV and station-file parsers producing `Observation`s.
/// - `fetch` — HTTP / local-file retrieval and per-dataset loading.

pub mod fetch;
pub mod table;

pub use fetch::{build_client, fetch_text, load_dataset, load_source, parse_dataset};
pub use table::{ParsedTable, parse_observation_csv, parse_station_file};
