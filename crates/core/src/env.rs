//! Typed environment-variable readers shared by the binaries' config
//! loaders. Call `dotenvy::dotenv()` before using these.

use std::str::FromStr;
use std::time::Duration;

/// Errors produced while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Read a required variable.
pub fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

/// Read and parse a variable, falling back to `default` when unset.
pub fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

/// Read and parse a variable that may be absent. Empty values count as unset.
pub fn parse_optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

/// Reject a zero period read from `key`. Timer loops cannot tick at zero.
pub fn nonzero(key: &'static str, period: Duration) -> Result<Duration, ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value: "0".into(),
        });
    }
    Ok(period)
}
