use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub content_cache_age_sec: Option<usize>,
    pub frontend_dir_path: Option<String>,

    pub stats: Option<StatsConfig>,
}

/// The `[stats]` table.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StatsConfig {
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    /// How many more rows than needed to read from the previous period
    pub previous_fetch_factor: Option<usize>,
    pub min_listen_ms: Option<u64>,
    pub feed_window_hours: Option<i64>,
    pub default_window_days: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
