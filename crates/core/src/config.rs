//! Application configuration.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_DATA_FILE;

/// Directory under the user's config dir that holds `config.toml`.
pub const CONFIG_DIR: &str = "vehicle-registry";
/// Prefix for environment overrides, e.g. `VEHICLE_REGISTRY_DATA_FILE`.
pub const ENV_PREFIX: &str = "VEHICLE_REGISTRY";

const DEFAULT_CONFIG: &str = r#"# Vehicle registry configuration.

# JSON file the registry is loaded from and saved to.
data_file = "carros.json"

# Directory receiving vehicles.log.
log_dir = "logs"
"#;

/// Runtime settings for the registry and its console driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Backing JSON file of the registry.
    pub data_file: PathBuf,
    /// Directory for log output.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Load from the default config file (if any) and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load using an explicit config file; missing files fall back to defaults.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("data_file", defaults.data_file.to_string_lossy().into_owned())?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().into_owned())?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}

/// Location of `config.toml`, or `None` when the platform has no config dir.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join("config.toml"))
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<Option<PathBuf>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    if path.exists() {
        return Ok(Some(path));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path))
}
