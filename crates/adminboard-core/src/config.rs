//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the idle timeout, watchdog interval, storage location and
//! last used login identifier.
//!
//! Configuration is stored at `~/.config/adminboard/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::SessionSettings;

/// Application name used for config/data directory paths
const APP_NAME: &str = "adminboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub idle_timeout_minutes: i64,
    pub watchdog_interval_secs: u64,
    /// Overrides the platform data directory for session storage
    pub storage_dir: Option<PathBuf>,
    pub last_identifier: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            idle_timeout_minutes: session.idle_timeout.num_minutes(),
            watchdog_interval_secs: session.watchdog_interval.as_secs(),
            storage_dir: None,
            last_identifier: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Session timing, with out-of-range values raised to the smallest
    /// usable setting
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: Duration::minutes(self.idle_timeout_minutes.max(1)),
            watchdog_interval: std::time::Duration::from_secs(self.watchdog_interval_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            idle_timeout_minutes: 15,
            last_identifier: Some("editor@demo.com".to_string()),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"idle_timeout_minutes": 5}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.idle_timeout_minutes, 5);
        assert_eq!(config.watchdog_interval_secs, 60);
        assert_eq!(config.last_identifier, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "idle_timeout_minutes = 5").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_session_settings_clamped() {
        let config = Config {
            idle_timeout_minutes: -10,
            watchdog_interval_secs: 0,
            ..Config::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.idle_timeout, Duration::minutes(1));
        assert_eq!(settings.watchdog_interval, std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_storage_dir_override() {
        let config = Config {
            storage_dir: Some(PathBuf::from("/tmp/adminboard-test")),
            ..Config::default()
        };
        assert_eq!(config.storage_dir().unwrap(), PathBuf::from("/tmp/adminboard-test"));
    }
}
