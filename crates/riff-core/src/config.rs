//! Configuration management for Riff.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.
//! Command-line flags override individual values after loading.

use crate::error::{Result, RiffError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure for Riff.
///
/// ## Example Configuration File (riff.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [scan]
/// workers = 0
/// sort_matches = false
///
/// [server]
/// bind_address = "0.0.0.0"
/// port = 10000
/// paths_file = "paths.txt"
/// request_timeout_ms = 30000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Batch and query scan tuning
    pub scan: ScanConfig,

    /// Query service settings
    pub server: ServerConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Scan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Batch worker threads (0 = available parallelism)
    pub workers: usize,

    /// Sort glob matches lexicographically
    pub sort_matches: bool,
}

/// Query service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,

    /// Manifest re-read on every request
    pub paths_file: PathBuf,

    /// Deadline for a request that does not carry its own
    pub request_timeout_ms: u64,

    /// Largest accepted request frame
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 10000,
            paths_file: PathBuf::from("paths.txt"),
            request_timeout_ms: 30_000,
            max_frame_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// `bind_address:port`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Default per-request deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| RiffError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| RiffError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "riff").ok_or_else(|| RiffError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("riff.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.server.paths_file, PathBuf::from("paths.txt"));
        assert_eq!(config.server.listen_address(), "0.0.0.0:10000");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("riff.toml");

        let mut config = Config::default();
        config.scan.workers = 3;
        config.server.port = 12345;

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.scan.workers, 3);
        assert_eq!(loaded.server.port, 12345);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("riff.toml");
        fs::write(&config_path, "[server]\nport = 9000\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config.server.port, 10000);
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("riff.toml");
        fs::write(&config_path, "[server\nport = ").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(matches!(err, RiffError::ConfigError { .. }));
    }
}
