//! Configuration management for keychain-kit
//!
//! Holds the default service namespace and log filter. Supports Windows,
//! macOS, and Linux config locations.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the default service namespace
pub const SERVICE_ENV_VAR: &str = "KEYCHAIN_SERVICE";

/// Errors that can occur while reading or writing the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory exists on this platform
    #[error("Could not determine config path")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("Config I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid JSON for this config
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeychainConfig {
    /// Service namespace for simple save/load/delete calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// `tracing` filter directives used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl KeychainConfig {
    /// Gets the config directory path (cross-platform)
    fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|p| PathBuf::from(p).join("keychain-kit"))
        }

        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|p| PathBuf::from(p).join("Library/Application Support/keychain-kit"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::var("HOME").ok().map(|p| PathBuf::from(p).join(".config")))
                .map(|p| p.join("keychain-kit"))
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }

    /// Gets the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    /// Loads configuration from the default location
    ///
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Loads configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Saves configuration to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolves the service namespace for simple calls
    ///
    /// Order: the config's `service`, then `KEYCHAIN_SERVICE`, then the
    /// running executable's name, then this crate's name.
    pub fn resolve_service(&self) -> String {
        self.service
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var(SERVICE_ENV_VAR).ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(default_service)
    }
}

/// The calling application's identifier: its executable name
pub fn default_service() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KeychainConfig::default();
        assert!(config.service.is_none());
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = KeychainConfig {
            service: Some("com.example.app".to_string()),
            log_filter: Some("keychain_kit=debug".to_string()),
        };

        let json = serde_json::to_string(&config).unwrap();
        let loaded: KeychainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_default() {
        let loaded: KeychainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, KeychainConfig::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = KeychainConfig {
            service: Some("svc".to_string()),
            log_filter: None,
        };
        config.save_to(&path).unwrap();

        let loaded = KeychainConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            KeychainConfig::load_from(&path),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            KeychainConfig::load_from(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_configured_service_wins() {
        let config = KeychainConfig {
            service: Some("configured".to_string()),
            log_filter: None,
        };
        assert_eq!(config.resolve_service(), "configured");
    }

    #[test]
    fn test_default_service_not_empty() {
        assert!(!default_service().is_empty());
    }
}
