//! Queue configuration loaded from environment variables.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `JOB_QUEUE`               | `txt2img`    |
//! | `JOB_MAX_RETRY`           | `10`         |
//! | `JOB_TIMEOUT_SECS`        | `180`        |
//! | `JOB_RETENTION_SECS`      | `7200`       |
//! | `ADMISSION_MAX_PENDING`   | unset        |
//! | `WORKER_CONCURRENCY`      | `10`         |
//! | `WORKER_QUEUES`           | `txt2img:3`  |
//! | `WORKER_POLL_INTERVAL_MS` | `1000`       |
//! | `RETRY_BACKOFF_BASE_MS`   | `1000`       |
//! | `RETRY_BACKOFF_MAX_SECS`  | `300`        |
//! | `SHUTDOWN_TIMEOUT_SECS`   | `30`         |
//! | `MAINTENANCE_INTERVAL_SECS` | `60`       |
//! | `STALE_GRACE_SECS`        | `30`         |

use std::time::Duration;

use lumen_core::env::{nonzero, parse_optional, parse_or, ConfigError};
use lumen_core::job::JobPolicy;
use lumen_core::txt2img::DEFAULT_QUEUE;

use crate::backoff::RetryBackoff;
use crate::weights::QueueWeights;

/// Optional cap on waiting jobs per queue. Disabled when `max_pending`
/// is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub max_pending: Option<u64>,
}

/// Policy a deployment applies when loaded from the environment.
pub const DEPLOYMENT_POLICY: JobPolicy = JobPolicy {
    max_retry: 10,
    timeout: Duration::from_secs(180),
    retention: Duration::from_secs(7200),
};

/// Submit-side settings.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Queue every submission lands in.
    pub queue: String,
    /// Overrides each job type's own default policy when set.
    pub policy: Option<JobPolicy>,
    pub admission: AdmissionPolicy,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            policy: None,
            admission: AdmissionPolicy::default(),
        }
    }
}

impl SubmitterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            queue: parse_or("JOB_QUEUE", DEFAULT_QUEUE.to_string())?,
            policy: Some(JobPolicy {
                max_retry: parse_or("JOB_MAX_RETRY", DEPLOYMENT_POLICY.max_retry)?,
                timeout: Duration::from_secs(parse_or(
                    "JOB_TIMEOUT_SECS",
                    DEPLOYMENT_POLICY.timeout.as_secs(),
                )?),
                retention: Duration::from_secs(parse_or(
                    "JOB_RETENTION_SECS",
                    DEPLOYMENT_POLICY.retention.as_secs(),
                )?),
            }),
            admission: AdmissionPolicy {
                max_pending: parse_optional("ADMISSION_MAX_PENDING")?,
            },
        })
    }
}

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on jobs executing at once.
    pub concurrency: usize,
    pub queues: QueueWeights,
    /// Idle sleep when every queue is empty.
    pub poll_interval: Duration,
    pub backoff: RetryBackoff,
    /// How long shutdown waits for in-flight jobs before aborting them.
    pub shutdown_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            queues: QueueWeights::single(DEFAULT_QUEUE),
            poll_interval: Duration::from_secs(1),
            backoff: RetryBackoff::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let concurrency: usize = parse_or("WORKER_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_CONCURRENCY",
                value: "0".into(),
            });
        }
        Ok(Self {
            concurrency,
            queues: parse_or("WORKER_QUEUES", defaults.queues)?,
            poll_interval: nonzero(
                "WORKER_POLL_INTERVAL_MS",
                Duration::from_millis(parse_or("WORKER_POLL_INTERVAL_MS", 1000)?),
            )?,
            backoff: RetryBackoff {
                base: Duration::from_millis(parse_or("RETRY_BACKOFF_BASE_MS", 1000)?),
                max: Duration::from_secs(parse_or("RETRY_BACKOFF_MAX_SECS", 300)?),
            },
            shutdown_timeout: Duration::from_secs(parse_or("SHUTDOWN_TIMEOUT_SECS", 30)?),
        })
    }
}

/// Retention sweep and stale-job recovery settings.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceConfig {
    pub interval: Duration,
    /// Slack past a running job's deadline before it is considered abandoned.
    pub stale_grace: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            stale_grace: Duration::from_secs(30),
        }
    }
}

impl MaintenanceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            interval: nonzero(
                "MAINTENANCE_INTERVAL_SECS",
                Duration::from_secs(parse_or("MAINTENANCE_INTERVAL_SECS", 60)?),
            )?,
            stale_grace: Duration::from_secs(parse_or("STALE_GRACE_SECS", 30)?),
        })
    }
}
