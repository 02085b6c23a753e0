//! Command-line entry point.
//!
//! `soilmon analyze` loads every configured dataset, runs the anomaly
//! analysis and writes CSV / JSON results, plus gridded backscatter
//! reductions for datasets with a `cube_channel`. `soilmon verify` checks
//! that the configured datasets are reachable and complete.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use soilmon_analysis::config::{AppConfig, DatasetConfig};
use soilmon_analysis::cube::BackscatterCube;
use soilmon_analysis::export;
use soilmon_analysis::ingest;
use soilmon_analysis::logging::{self, DataSource};
use soilmon_analysis::model::Observation;
use soilmon_analysis::pipeline;
use soilmon_analysis::verify;

#[derive(Parser, Debug)]
#[command(name = "soilmon")]
#[command(about = "Soil-moisture and backscatter anomaly analysis")]
struct Args {
    /// Configuration file path (falls back to ./soilmon.toml)
    #[arg(short, long, global = true, env = "SOILMON_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overriding the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load datasets, compute anomalies, write results
    Analyze {
        /// Directory for CSV / JSON output
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Only analyze this dataset
        #[arg(short, long)]
        dataset: Option<String>,
    },
    /// Check every configured dataset against its source
    Verify,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config_path = AppConfig::resolve_path(args.config.as_deref());
    let config = AppConfig::load(&config_path)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    logging::init_logger(level);
    logging::info(
        DataSource::System,
        None,
        &format!("loaded config {}", config_path.display()),
    );

    let client = ingest::build_client()?;

    match args.command {
        Command::Analyze { output_dir, dataset } => {
            run_analysis(&client, &config, &output_dir, dataset.as_deref())
        }
        Command::Verify => {
            let report = verify::run_verification(&client, &config);
            println!("{}", serde_json::to_string_pretty(&report)?);
            logging::info(
                DataSource::System,
                None,
                &format!("success rate {:.1}%", verify::success_rate(&report.summary)),
            );
            Ok(())
        }
    }
}

fn run_analysis(
    client: &reqwest::blocking::Client,
    config: &AppConfig,
    output_dir: &Path,
    only: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let datasets: Vec<_> = config
        .datasets
        .iter()
        .filter(|d| only.is_none_or(|name| d.name == name))
        .collect();
    if datasets.is_empty() {
        return Err(format!("no dataset matches {:?}", only.unwrap_or("<any>")).into());
    }

    std::fs::create_dir_all(output_dir)?;

    let mut successful = 0;
    let mut failed = 0;

    for dataset in &datasets {
        let table = match ingest::load_dataset(client, dataset) {
            Ok(table) => table,
            Err(e) => {
                logging::log_load_failure(&dataset.name, "load", &e);
                failed += 1;
                continue;
            }
        };

        let report = match pipeline::analyze(&dataset.name, &table.observations, &config.anomaly) {
            Ok(report) => report,
            Err(e) => {
                logging::error(DataSource::Analysis, Some(&dataset.name), &e.to_string());
                failed += 1;
                continue;
            }
        };

        let out = |suffix: &str| output_dir.join(format!("{}.{}", dataset.name, suffix));
        export::write_scores_csv(
            BufWriter::new(File::create(out("scores.csv"))?),
            &report.scored,
        )?;
        export::write_summaries_csv(
            BufWriter::new(File::create(out("summary.csv"))?),
            &report.summaries,
        )?;
        export::write_report_json(
            BufWriter::new(File::create(out("report.json"))?),
            &report,
        )?;
        if let Some(channel) = &dataset.cube_channel {
            write_cube(dataset, channel, &table.observations, &out)?;
        }

        logging::info(
            DataSource::System,
            Some(&dataset.name),
            &format!("results written to {}", output_dir.display()),
        );
        successful += 1;
    }

    logging::log_load_summary(datasets.len(), successful, failed);
    if successful == 0 {
        return Err("no dataset could be analyzed".into());
    }
    Ok(())
}

fn write_cube(
    dataset: &DatasetConfig,
    channel: &str,
    observations: &[Observation],
    out: &dyn Fn(&str) -> PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let cube = match BackscatterCube::from_observations(observations, channel) {
        Ok(cube) => cube,
        Err(e) => {
            logging::warn(DataSource::Analysis, Some(&dataset.name), &e.to_string());
            return Ok(());
        }
    };
    let (nt, ny, nx) = cube.shape();
    logging::info(
        DataSource::Analysis,
        Some(&dataset.name),
        &format!("{} cube: {} acquisitions on a {}x{} grid", channel, nt, ny, nx),
    );
    export::write_cube_pixels_csv(
        BufWriter::new(File::create(out(&format!("{}.pixels.csv", channel)))?),
        &cube,
    )?;
    export::write_cube_series_csv(
        BufWriter::new(File::create(out(&format!("{}.series.csv", channel)))?),
        &cube,
    )?;
    Ok(())
}
