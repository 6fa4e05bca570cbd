mod file_config;

pub use file_config::{FileConfig, StatsConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,

    pub stats: StatsSettings,
}

/// Knobs of the stats reports.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    /// The previous period's list is read with `needed rows × factor` rows,
    /// so that entities that slipped down still find their old rank.
    pub previous_fetch_factor: usize,
    /// Plays shorter than this don't count towards play counts.
    pub min_listen_ms: u64,
    pub feed_window_hours: i64,
    /// Dashboard window length when no start date is given.
    pub default_window_days: i64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            previous_fetch_factor: 2,
            min_listen_ms: 30_000,
            feed_window_hours: 24,
            default_window_days: 30,
        }
    }
}

impl StatsSettings {
    fn resolve(file: Option<StatsConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let settings = Self {
            default_limit: file.default_limit.unwrap_or(defaults.default_limit),
            max_limit: file.max_limit.unwrap_or(defaults.max_limit),
            previous_fetch_factor: file
                .previous_fetch_factor
                .unwrap_or(defaults.previous_fetch_factor),
            min_listen_ms: file.min_listen_ms.unwrap_or(defaults.min_listen_ms),
            feed_window_hours: file.feed_window_hours.unwrap_or(defaults.feed_window_hours),
            default_window_days: file
                .default_window_days
                .unwrap_or(defaults.default_window_days),
        };

        if settings.max_limit == 0 {
            bail!("stats.max_limit must be at least 1");
        }
        if settings.default_limit == 0 || settings.default_limit > settings.max_limit {
            bail!(
                "stats.default_limit must be between 1 and {}",
                settings.max_limit
            );
        }
        if settings.previous_fetch_factor == 0 {
            bail!("stats.previous_fetch_factor must be at least 1");
        }
        if settings.feed_window_hours <= 0 || settings.default_window_days <= 0 {
            bail!("stats.feed_window_hours and stats.default_window_days must be positive");
        }
        Ok(settings)
    }

    /// Clamps a requested page size into `[1, max_limit]`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let stats = StatsSettings::resolve(file.stats)?;

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            stats,
        })
    }

    pub fn stats_db_path(&self) -> PathBuf {
        self.db_dir.join("stats.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
