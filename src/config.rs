use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::YearBounds;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub bounds: BoundsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one data root per clan.
    pub root: PathBuf,
}

impl StorageConfig {
    /// Data root of one clan: `<root>/<clan>`.
    pub fn clan_root(&self, clan: &str) -> PathBuf {
        self.root.join(clan)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_true")]
    pub replace_invalid_utf8: bool,
    /// Plain-text uploads only; word packages are always scrubbed.
    #[serde(default = "default_true")]
    pub remove_sensitive_lines: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            replace_invalid_utf8: true,
            remove_sensitive_lines: true,
        }
    }
}

fn default_max_upload_bytes() -> usize {
    1 << 20
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoundsConfig {
    #[serde(default = "default_upload_bounds")]
    pub upload: YearBounds,
    #[serde(default = "default_report_id_bounds")]
    pub report_id: YearBounds,
    #[serde(default = "default_catalog_bounds")]
    pub catalog: YearBounds,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            upload: YearBounds::UPLOAD,
            report_id: YearBounds::REPORT_ID,
            catalog: YearBounds::CATALOG,
        }
    }
}

fn default_upload_bounds() -> YearBounds {
    YearBounds::UPLOAD
}
fn default_report_id_bounds() -> YearBounds {
    YearBounds::REPORT_ID
}
fn default_catalog_bounds() -> YearBounds {
    YearBounds::CATALOG
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.ingest.max_upload_bytes == 0 {
        anyhow::bail!("ingest.max_upload_bytes must be > 0");
    }

    for (name, bounds) in [
        ("upload", config.bounds.upload),
        ("report_id", config.bounds.report_id),
        ("catalog", config.bounds.catalog),
    ] {
        if bounds.min_year > bounds.max_year {
            anyhow::bail!(
                "bounds.{}: min_year {} is greater than max_year {}",
                name,
                bounds.min_year,
                bounds.max_year
            );
        }
    }

    if config.logging.filter.trim().is_empty() {
        anyhow::bail!("logging.filter must not be empty");
    }

    Ok(config)
}
