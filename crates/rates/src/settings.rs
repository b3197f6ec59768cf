//! Country settings persistence (flat JSON file).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use royaltyhub_core::DomainError;

use crate::country::RateTable;

/// Environment variable overriding the settings file location.
pub const SETTINGS_PATH_ENV: &str = "ROYALTYHUB_SETTINGS";

const DEFAULT_SETTINGS_PATH: &str = "data/country_settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid country settings: {0}")]
    Invalid(#[from] DomainError),
}

/// Settings path from `ROYALTYHUB_SETTINGS`, or `data/country_settings.json`.
pub fn default_settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SettingsError + '_ {
    move |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl RateTable {
    /// Parse and validate a settings document.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let table: RateTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load the table from `path`. A missing file is created with the
    /// built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "settings file missing; writing built-in defaults");
            let table = RateTable::builtin();
            table.save(path)?;
            return Ok(table);
        }

        let json = fs::read_to_string(path).map_err(io_error(path))?;
        let table = Self::from_json_str(&json)?;
        debug!(path = %path.display(), countries = table.len(), "loaded country settings");
        Ok(table)
    }

    /// Write the table as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(path))?;
        }
        fs::write(path, self.to_json_string()?).map_err(io_error(path))
    }
}
