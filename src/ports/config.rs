use std::path::PathBuf;

use crate::domain::{AppConfig, DomainError};

/// Where [`AppConfig`] lives between runs.
pub trait ConfigStore: Send + Sync {
    /// Read the stored configuration, writing defaults first when there is none.
    ///
    /// Malformed content is a `DomainError::Config`.
    fn load(&self) -> Result<AppConfig, DomainError>;

    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    fn config_path(&self) -> PathBuf;

    /// Directory for the rolling log file, when file logging is on.
    fn logs_dir(&self) -> PathBuf;
}
