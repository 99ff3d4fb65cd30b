//! Configuration management

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tariff-comparator";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        let app_config_dir = config_dir.join(APP_DIR);

        if !app_config_dir.exists() {
            fs::create_dir_all(&app_config_dir)?;
        }

        Ok(app_config_dir.join("config.toml"))
    }

    /// Load configuration from the platform config directory, writing defaults on first run
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            return Ok(config);
        }

        Self::load_from(&path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Database file, from the storage section or the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("comparisons.db")),
        }
    }

    /// Catalog file, from the storage section or the platform data directory
    pub fn catalog_path(&self) -> Result<PathBuf> {
        match &self.storage.catalog_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("catalog.toml")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir)?;

    Ok(app_dir)
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Language: "auto", "en", "es"
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String { "auto".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

/// Comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Currency symbol used when printing amounts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Resolve a commission for each result when a consultant is given
    #[serde(default = "default_true")]
    pub attach_commissions: bool,
    /// Keep only the N cheapest results
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_currency_symbol() -> String { "\u{20AC}".to_string() } // Euro sign
fn default_true() -> bool { true }

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            attach_commissions: true,
            max_results: None,
        }
    }
}

/// File locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}
