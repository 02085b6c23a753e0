/// Site registry for the soil-moisture network.
///
/// Sites are declared in the `[[sites]]` section of the config file. This is
/// the single source of truth for site names and their expected channels;
/// other modules look sites up here rather than hardcoding names.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// Metadata for a single measurement site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Site name as it appears in dataset site columns.
    pub name: String,
    /// Free-text note on the site (land cover, sensor depth...).
    #[serde(default)]
    pub description: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Channels this site is expected to report, e.g. "sm_0.05" or "VV".
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Checks that names are non-empty and unique and coordinates are in range.
pub fn validate_sites(sites: &[Site]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err("site name must not be empty".to_string());
        }
        if !seen.insert(site.name.as_str()) {
            return Err(format!("duplicate site name '{}'", site.name));
        }
        if !(-90.0..=90.0).contains(&site.latitude) || !(-180.0..=180.0).contains(&site.longitude) {
            return Err(format!(
                "site '{}' has out-of-range coordinates ({}, {})",
                site.name, site.latitude, site.longitude
            ));
        }
    }
    Ok(())
}

/// Names of all registered sites, in registry order.
pub fn all_site_names(sites: &[Site]) -> Vec<&str> {
    sites.iter().map(|s| s.name.as_str()).collect()
}

/// Names of sites expected to report `channel`.
pub fn sites_with_channel<'a>(sites: &'a [Site], channel: &str) -> Vec<&'a str> {
    sites
        .iter()
        .filter(|s| s.channels.iter().any(|c| c == channel))
        .map(|s| s.name.as_str())
        .collect()
}

/// Looks up a site by name. Returns `None` if not found.
pub fn find_site<'a>(sites: &'a [Site], name: &str) -> Option<&'a Site> {
    sites.iter().find(|s| s.name == name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
