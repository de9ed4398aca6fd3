use crate::shared::paths::{ensure_dir, get_log_dir, get_storage_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TASKS_FILE: &str = "tasks.json";
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Overrides the XDG storage directory when set.
    pub data_dir: Option<PathBuf>,
    pub tasks_file: String,
    /// `None` disables the write timeout.
    pub write_timeout_ms: Option<u64>,
    pub watch_external_changes: bool,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            tasks_file: DEFAULT_TASKS_FILE.to_string(),
            write_timeout_ms: Some(DEFAULT_WRITE_TIMEOUT_MS),
            watch_external_changes: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_storage_dir)
    }

    pub fn tasks_path(&self) -> PathBuf {
        let file = if self.tasks_file.trim().is_empty() {
            DEFAULT_TASKS_FILE
        } else {
            self.tasks_file.as_str()
        };
        self.data_dir().join(file)
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.join("logs"),
            None => get_log_dir(),
        }
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn get_settings_path() -> PathBuf {
    get_storage_dir().join("settings.json")
}

/// Loads settings from the storage directory, falling back to defaults when
/// the file is missing or unreadable.
pub fn load_settings() -> AppSettings {
    let path = get_settings_path();

    if !path.exists() {
        return AppSettings::default();
    }

    match load_settings_from_file(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(
                target: "system",
                path = %path.display(),
                error = %e,
                "Invalid settings file, using defaults"
            );
            AppSettings::default()
        }
    }
}

pub fn load_settings_from_file(path: &Path) -> Result<AppSettings, SettingsError> {
    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings(settings: &AppSettings) -> Result<(), SettingsError> {
    save_settings_to_file(settings, &get_settings_path())
}

pub fn save_settings_to_file(settings: &AppSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}
