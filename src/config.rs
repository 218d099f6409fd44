use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Username seeded into a fresh config file
pub const DEFAULT_USER: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default = "default_users")]
    pub users: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            report_dir: default_report_dir(),
            organization: default_organization(),
            logo_path: None,
            users: default_users(),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_report_dir() -> String {
    ".".to_string()
}

fn default_organization() -> String {
    "Ministerios Vida".to_string()
}

fn default_users() -> BTreeMap<String, String> {
    BTreeMap::from([(DEFAULT_USER.to_string(), DEFAULT_PASSWORD.to_string())])
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from the profile's config directory, or create the
    /// default file if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path, profile)
    }

    /// Load configuration from an explicit file. A missing file is created with
    /// defaults whose database lives in the profile's data directory.
    pub fn load_from_path(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config: Config = toml::from_str(&contents)?;
            tracing::debug!("Loaded configuration from {:?}", config_path);
            config.warn_on_default_credentials();
            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_to_path(config_path)?;
            tracing::info!("Created default configuration at {:?}", config_path);
            config.warn_on_default_credentials();
            Ok(config)
        }
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("congrega.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/congrega-dev/congrega.db".to_string(),
                utils::Profile::Prod => "~/.local/share/congrega/congrega.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    pub fn get_report_dir(&self) -> PathBuf {
        utils::expand_path(&self.report_dir)
    }

    pub fn get_logo_path(&self) -> Option<PathBuf> {
        self.logo_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(utils::expand_path)
    }

    /// Heading printed at the top of every report page
    pub fn report_title(&self) -> String {
        format!("Reporte - {}", self.organization)
    }

    fn warn_on_default_credentials(&self) {
        if self.users.get(DEFAULT_USER).map(String::as_str) == Some(DEFAULT_PASSWORD) {
            tracing::warn!(
                "The default '{}' account still uses its initial password; edit [users] in the config file",
                DEFAULT_USER
            );
        }
    }
}
