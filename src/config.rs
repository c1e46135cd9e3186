use crate::advisor::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::data::DataPaths;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Legacy variable name some deployments keep the key under
const LEGACY_KEY_VAR: &str = "api_gemini";

/// Mortality risk map with AI public-health recommendations
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Risk cluster table (CSV)
    #[arg(long, env = "RISK_DATA", default_value = "data/risk_cluster.csv")]
    pub risk: PathBuf,

    /// Cause-of-death detail table (CSV)
    #[arg(long, env = "DETAIL_DATA", default_value = "data/detail_penyebab.csv")]
    pub detail: PathBuf,

    /// Region boundaries (GeoJSON FeatureCollection)
    #[arg(long, env = "BOUNDARY_DATA", default_value = "data/Jabar_By_Kab.geojson")]
    pub boundaries: PathBuf,

    /// Feature property holding the region name
    #[arg(long, env = "BOUNDARY_NAME_PROP", default_value = "KABKOT")]
    pub name_property: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model identifier
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Gemini models endpoint
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub api_base: String,

    /// Request timeout in seconds (client default when unset)
    #[arg(long, env = "GEMINI_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, env = "RISK_ATLAS_LOG", default_value = "risk-atlas.log")]
    pub log_file: PathBuf,
}

impl Args {
    /// Load `.env` (if present) and parse the command line
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths {
            risk: self.risk.clone(),
            detail: self.detail.clone(),
            boundaries: self.boundaries.clone(),
            name_property: self.name_property.clone(),
        }
    }

    pub fn gemini(&self) -> GeminiConfig {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(LEGACY_KEY_VAR).ok())
            .filter(|k| !k.trim().is_empty());
        GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.api_base.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}
