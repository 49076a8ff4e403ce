//! Configuration loading.
//!
//! A [`Config`] is built once at startup from an optional TOML file and the
//! process environment (environment wins), then passed by reference to
//! whatever builds the flow's collaborators.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the ledger spreadsheet id
pub const SPREADSHEET_ID_ENV: &str = "SPREADSHEET_ID";

/// Environment variable holding the service-account JSON payload
pub const CREDENTIALS_ENV: &str = "GOOGLE_SHEETS_CREDENTIALS";

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_GEO_BASE_URL: &str = "http://ip-api.com";

/// On-disk configuration file layout
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    pub ledger: Option<LedgerConfig>,
    pub geolocation: Option<GeolocationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LedgerConfig {
    pub spreadsheet_id: Option<String>,
    /// Path to a service-account JSON file, read when the env payload is absent
    pub credentials_file: Option<PathBuf>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GeolocationConfig {
    pub base_url: Option<String>,
}

/// Resolved runtime configuration
#[derive(Clone)]
pub struct Config {
    pub spreadsheet_id: String,
    pub credentials_json: Option<String>,
    pub sheets_base_url: String,
    pub geo_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            credentials_json: None,
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
        }
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field(
                "credentials_json",
                &self.credentials_json.as_ref().map(|_| "<redacted>"),
            )
            .field("sheets_base_url", &self.sheets_base_url)
            .field("geo_base_url", &self.geo_base_url)
            .finish()
    }
}

impl Config {
    /// Merge a file config with variables from `env`.
    ///
    /// `env` is a lookup function so callers can supply something other than
    /// the process environment.
    pub fn resolve<F>(file: &FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger = file.ledger.clone().unwrap_or_default();
        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let spreadsheet_id = non_empty(SPREADSHEET_ID_ENV)
            .or(ledger.spreadsheet_id)
            .unwrap_or_default();

        let credentials_json = match non_empty(CREDENTIALS_ENV) {
            Some(payload) => Some(payload),
            None => match &ledger.credentials_file {
                Some(path) => Some(std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read credentials file: {}", path.display())
                })?),
                None => None,
            },
        };

        let geo_base_url = file
            .geolocation
            .as_ref()
            .and_then(|geo| geo.base_url.clone())
            .unwrap_or_else(|| DEFAULT_GEO_BASE_URL.to_string());

        Ok(Self {
            spreadsheet_id,
            credentials_json,
            sheets_base_url: ledger
                .base_url
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
            geo_base_url,
        })
    }

    /// Load the file at `path` (missing means defaults) and overlay the
    /// process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let file = load_file_config(path)?;
        Self::resolve(&file, |key| std::env::var(key).ok())
    }

    /// Process environment over built-in defaults, ignoring any file
    pub fn from_env() -> Result<Self> {
        Self::resolve(&FileConfig::default(), |key| std::env::var(key).ok())
    }

    /// Check the settings needed to talk to the real ledger
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            anyhow::bail!(
                "No spreadsheet id configured.\n\
                 Set it with: export {SPREADSHEET_ID_ENV}=<spreadsheet id>"
            );
        }
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "attendance")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&contents).context("Failed to parse config file as TOML")?;
    Ok(config)
}
