use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

const APP_DIR: &str = "livescribe";
const CONFIG_FILE: &str = "config.toml";

/// TOML-based configuration store.
pub struct TomlConfigStore {
    config_path: PathBuf,
    logs_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a store in the OS-specific configuration directory.
    /// - macOS: ~/Library/Application Support/livescribe/
    /// - Windows: %APPDATA%\livescribe\
    /// - Linux: ~/.config/livescribe/
    pub fn new() -> Result<Self, DomainError> {
        let data_dir = dirs::config_dir()
            .map(|p| p.join(APP_DIR))
            .ok_or_else(|| {
                DomainError::Config("Could not find application config directory".to_string())
            })?;

        let logs_dir = dirs::data_local_dir()
            .map(|p| p.join(APP_DIR).join("logs"))
            .unwrap_or_else(|| data_dir.join("logs"));

        info!(data_dir = ?data_dir, "ConfigStore initialized");

        Ok(Self {
            config_path: data_dir.join(CONFIG_FILE),
            logs_dir,
        })
    }

    /// Create a store backed by an explicit file. Logs go next to it.
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        let config_path = path.as_ref().to_path_buf();
        let logs_dir = config_path
            .parent()
            .map(|p| p.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));

        Self {
            config_path,
            logs_dir,
        }
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone()
    }
}
