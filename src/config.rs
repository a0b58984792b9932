use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchParams,
    pub enrichment: EnrichmentConfig,
    pub summary: SummaryConfig,
    pub output: OutputConfig,
}

/// Search parameter bag sent to the listing feed. Defaults reproduce the
/// standing DC-area query.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub region_id: u32,
    pub region_type: u32,
    pub market: String,
    pub max_price: u64,
    pub num_beds: u32,
    pub max_num_beds: u32,
    pub num_baths: u32,
    pub min_listing_approx_size: u32,
    pub max_listing_approx_size: u32,
    pub hoa: u32,
    pub status: String,
    pub uipt: String,
    pub sf: String,
    pub num_homes: u32,
    pub page_number: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            region_id: 2965,
            region_type: 5,
            market: "dc".to_string(),
            max_price: 800_000,
            num_beds: 2,
            max_num_beds: 4,
            num_baths: 2,
            min_listing_approx_size: 1700,
            max_listing_approx_size: 3000,
            hoa: 150,
            status: "9".to_string(),
            uipt: "1,2,3,4,5,6,7,8".to_string(),
            sf: "1,2,3,5,6,7".to_string(),
            num_homes: 450,
            page_number: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Upper bound on in-flight resolver calls
    pub concurrency: usize,
    /// Per-request timeout; a hung call degrades to an unresolved value
    pub timeout_seconds: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Overpriced values at or above this are excluded from the adjusted
    /// statistics (stale tax records on new construction)
    pub outlier_threshold: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            outlier_threshold: 200_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub listings_path: String,
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            listings_path: "output/listings.csv".to_string(),
            summary_path: "output/per_day_summary.csv".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            info!("No config file at '{}', using defaults", config_path);
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
