use std::time::Duration;

use axum::http::HeaderValue;
use lumen_core::env::{nonzero, parse_or, ConfigError};
use lumen_queue::waiter::DEFAULT_POLL_INTERVAL;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `1324`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `240`). Keep this above
    /// `wait_timeout` so a slow job reports 504 rather than 408.
    pub request_timeout_secs: u64,
    /// How long a request waits for its job (default: 180 s).
    pub wait_timeout: Duration,
    /// Interval between job record lookups while waiting (default: 1 s).
    pub wait_poll_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `1324`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `240`                   |
    /// | `WAIT_TIMEOUT_SECS`     | `180`                   |
    /// | `WAIT_POLL_INTERVAL_MS` | `1000`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| ConfigError::Invalid {
                    key: "CORS_ORIGINS",
                    value: origin.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            host,
            port: parse_or("PORT", 1324)?,
            cors_origins,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 240)?,
            wait_timeout: Duration::from_secs(parse_or("WAIT_TIMEOUT_SECS", 180)?),
            wait_poll_interval: nonzero(
                "WAIT_POLL_INTERVAL_MS",
                Duration::from_millis(parse_or(
                    "WAIT_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL.as_millis() as u64,
                )?),
            )?,
        })
    }
}
