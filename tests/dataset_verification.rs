//! Live Dataset Verification Tests
//!
//! These tests fetch the datasets listed in the config named by
//! `SOILMON_CONFIG` and report which are reachable and complete. They depend
//! on network access and external catalogs, so they are marked #[ignore]:
//!
//!   SOILMON_CONFIG=soilmon.toml cargo test --test dataset_verification -- --ignored

use soilmon_analysis::config::{AppConfig, CONFIG_ENV_VAR};
use soilmon_analysis::ingest::build_client;
use soilmon_analysis::verify::{VerificationStatus, run_verification, success_rate};

#[test]
#[ignore] // Don't run in CI - depends on external catalogs
fn live_datasets_are_reachable() {
    dotenv::dotenv().ok();
    let explicit = std::env::var_os(CONFIG_ENV_VAR).map(std::path::PathBuf::from);
    let path = AppConfig::resolve_path(explicit.as_deref());
    let config = AppConfig::load(&path).expect("config named by SOILMON_CONFIG should load");
    let client = build_client().unwrap();

    let report = run_verification(&client, &config);

    println!("\n🔍 Dataset verification ({}):", path.display());
    for result in &report.datasets {
        println!(
            "  {} — {:?}, {} observations, {} skipped",
            result.name, result.status, result.observation_count, result.skipped_rows
        );
        if let Some(err) = &result.error_message {
            println!("    error: {}", err);
        }
        if !result.sites_missing.is_empty() {
            println!("    missing sites: {:?}", result.sites_missing);
        }
    }
    println!("Success rate: {:.1}%", success_rate(&report.summary));

    assert!(
        report.datasets.iter().any(|d| d.status != VerificationStatus::Failed),
        "no configured dataset could be loaded"
    );
}

#[test]
#[ignore] // Don't run in CI - depends on external network
fn unreachable_url_fails_verification() {
    let config = AppConfig::from_toml_str(
        "[[datasets]]\nname = \"gone\"\nurl = \"https://example.invalid/sm.csv\"\n",
    )
    .unwrap();
    let client = build_client().unwrap();
    let report = run_verification(&client, &config);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.datasets[0].status, VerificationStatus::Failed);
}
