use std::{path::PathBuf, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{LmuWeatherError, poller::DEFAULT_POLL_INTERVAL_MS, weather::client::DEFAULT_BASE_URL};

const CONFIG_DIR_NAME: &str = "lmu-weather";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_TELEMETRY_REFRESH_MS: u64 = 100;
pub const DEFAULT_EXPECTED_GAME: &str = "LMU";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the simulator REST server
    pub base_url: String,
    pub poll_interval_ms: u64,
    /// Upper bound for a single REST request
    pub request_timeout_ms: u64,
    /// Game identifier reported by the host while the simulator is running
    pub expected_game: String,
    pub telemetry_refresh_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            expected_game: DEFAULT_EXPECTED_GAME.to_string(),
            telemetry_refresh_ms: DEFAULT_TELEMETRY_REFRESH_MS,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, LmuWeatherError> {
        Ok(dirs::config_dir()
            .ok_or(LmuWeatherError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Reads the config from the user's config directory. A missing file is not an
    /// error.
    pub fn from_local_file() -> Result<Option<Self>, LmuWeatherError> {
        Self::from_file(&Self::default_path()?)
    }

    pub fn from_file(config_path: &PathBuf) -> Result<Option<Self>, LmuWeatherError> {
        if !config_path.exists() {
            debug!("No config file at {:?}, using defaults", config_path);
            return Ok(None);
        }

        let file = std::fs::File::open(config_path)
            .map_err(|e| LmuWeatherError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| LmuWeatherError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), LmuWeatherError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, config_path: &PathBuf) -> Result<(), LmuWeatherError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LmuWeatherError::ConfigIOError { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| LmuWeatherError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LmuWeatherError::ConfigSerializeError { source: e })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn telemetry_refresh(&self) -> Duration {
        Duration::from_millis(self.telemetry_refresh_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:6397");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.expected_game, "LMU");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = AppConfig {
            base_url: "http://192.168.1.20:6397".to_string(),
            poll_interval_ms: 2500,
            ..AppConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            AppConfig::from_file(&dir.path().join(CONFIG_FILE_NAME)).unwrap(),
            None
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"expected_game": "LMU2"}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap().unwrap();
        assert_eq!(config.expected_game, "LMU2");
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(LmuWeatherError::ConfigSerializeError { .. })
        ));
    }
}
