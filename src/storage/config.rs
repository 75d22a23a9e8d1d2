//! Application configuration.
//!
//! Loaded from TOML in the platform data directory unless a path is given.

use crate::export::types::ExportConfig;
use chrono::format::{Item, StrftimeItems};
use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Where exported files go; the system temp directory when unset
    pub output_dir: Option<PathBuf>,
    /// Export formatting settings
    pub export: ExportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            output_dir: None,
            export: ExportSettings::default(),
        }
    }
}

impl AppConfig {
    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Export-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// `creator` attribute of exported documents
    pub creator: String,
    /// strftime pattern for the start time in the track name
    pub title_time_format: String,
    /// strftime pattern for the start time in file names
    pub file_time_format: String,
    /// Fixed UTC offset for names and titles; the local offset when unset
    pub utc_offset_minutes: Option<i32>,
    /// Stage output and rename it into place once complete
    pub atomic_write: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let defaults = ExportConfig::default();
        Self {
            creator: defaults.creator,
            title_time_format: defaults.title_time_format,
            file_time_format: defaults.file_time_format,
            utc_offset_minutes: None,
            atomic_write: defaults.atomic_write,
        }
    }
}

impl ExportSettings {
    /// Build the exporter configuration. The local offset is read once here
    /// so exports themselves never consult process-wide time zone state.
    pub fn to_export_config(&self) -> Result<ExportConfig, ConfigError> {
        let utc_offset = match self.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                ConfigError::ParseError(format!("UTC offset out of range: {} minutes", minutes))
            })?,
            None => Local::now().offset().fix(),
        };

        for pattern in [&self.title_time_format, &self.file_time_format] {
            validate_time_format(pattern)?;
        }

        Ok(ExportConfig {
            creator: self.creator.clone(),
            title_time_format: self.title_time_format.clone(),
            file_time_format: self.file_time_format.clone(),
            utc_offset,
            atomic_write: self.atomic_write,
        })
    }
}

/// Reject strftime patterns chrono cannot render.
fn validate_time_format(pattern: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::ParseError(format!(
            "invalid time format: {}",
            pattern
        )));
    }
    Ok(())
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "workoutgpx", "WorkoutGpx")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from a file; a missing file gives the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write a configuration file, creating its directory when missing.
///
/// Existing files are only replaced when `overwrite` is set.
pub fn save_config(config: &AppConfig, path: &Path, overwrite: bool) -> Result<(), ConfigError> {
    if path.exists() && !overwrite {
        return Err(ConfigError::IoError(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    tracing::info!("Wrote configuration to {}", path.display());
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
