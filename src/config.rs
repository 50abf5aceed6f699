//! User configuration
//!
//! Settings live in an optional TOML file at
//! `<config_home>/krxdash/config.toml`. Every key has a default, so a missing
//! file is not an error. A few environment variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::DashError;
use crate::reports::Labels;

const CONFIG_FILENAME: &str = "config.toml";
/// A century of daily bars is more than any listing has
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Column label language for tables and exports
    pub labels: Labels,
    /// Lookback used when `--from` is omitted
    pub default_lookback_days: i64,
    /// Age after which the listed company cache is downloaded again
    pub listing_max_age_hours: i64,
    /// In-process TTL of fetched price series
    pub price_cache_ttl_hours: i64,
    pub http_timeout_secs: u64,
    /// Directory for exported workbooks (current directory when unset)
    pub export_dir: Option<PathBuf>,
    /// Root of the on-disk caches (`<cache_home>/krxdash` when unset)
    pub cache_dir: Option<PathBuf>,
    pub chart_width: usize,
    pub chart_height: usize,
    /// Never touch the network; set by `KRXDASH_OFFLINE=1`
    #[serde(skip)]
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            labels: Labels::Korean,
            default_lookback_days: 365,
            listing_max_age_hours: 24,
            price_cache_ttl_hours: 24,
            http_timeout_secs: 15,
            export_dir: None,
            cache_dir: None,
            chart_width: 72,
            chart_height: 16,
            offline: false,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DashError::Config(e.message().to_string()).into())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("KRXDASH_OFFLINE") {
            self.offline = value != "0" && !value.is_empty();
        }
        if let Ok(value) = std::env::var("KRXDASH_LABELS") {
            match value.parse::<Labels>() {
                Ok(labels) => self.labels = labels,
                Err(_) => tracing::warn!("Ignoring invalid KRXDASH_LABELS value: {}", value),
            }
        }
        if let Ok(dir) = std::env::var("KRXDASH_EXPORT_DIR") {
            self.export_dir = Some(PathBuf::from(dir));
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.default_lookback_days) {
            return Err(DashError::Config(format!(
                "default_lookback_days must be between 1 and {}",
                MAX_LOOKBACK_DAYS
            ))
            .into());
        }
        if self.listing_max_age_hours <= 0 {
            return Err(DashError::Config("listing_max_age_hours must be positive".into()).into());
        }
        if self.price_cache_ttl_hours < 0 {
            return Err(
                DashError::Config("price_cache_ttl_hours must not be negative".into()).into(),
            );
        }
        if self.chart_width < 16 || self.chart_height < 4 {
            return Err(
                DashError::Config("chart must be at least 16 columns by 4 rows".into()).into(),
            );
        }
        Ok(())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("krxdash").join(CONFIG_FILENAME))
}

static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide configuration, loaded on first use
pub fn get_config() -> Result<&'static Config> {
    if let Some(config) = GLOBAL_CONFIG.get() {
        return Ok(config);
    }
    let config = Config::load()?;
    Ok(GLOBAL_CONFIG.get_or_init(|| config))
}
