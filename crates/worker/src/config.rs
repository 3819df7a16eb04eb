use lumen_core::env::{required, ConfigError};
use lumen_db::DatabaseConfig;
use lumen_queue::config::{DispatcherConfig, MaintenanceConfig};

/// Worker configuration loaded from environment variables.
///
/// `SD_API_HOST` is required, e.g. `http://127.0.0.1:7860`. See
/// [`lumen_queue::config`] for the dispatcher and maintenance variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub sd_api_host: String,
    pub dispatcher: DispatcherConfig,
    pub maintenance: MaintenanceConfig,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            sd_api_host: required("SD_API_HOST")?,
            dispatcher: DispatcherConfig::from_env()?,
            maintenance: MaintenanceConfig::from_env()?,
        })
    }
}
