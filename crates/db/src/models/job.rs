//! Row model for the `jobs` table.

use std::time::Duration;

use lumen_core::error::StoreError;
use lumen_core::job::{ClaimedJob, JobEnvelope, JobPolicy, JobRecord, JobState, StateId};
use lumen_core::types::{JobId, Timestamp};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub queue: String,
    pub job_type: String,
    pub state_id: StateId,
    pub payload: Vec<u8>,
    pub result: Option<Vec<u8>>,
    pub max_retry: i32,
    pub retried: i32,
    pub timeout_ms: i64,
    pub retention_ms: i64,
    pub last_error: Option<String>,
    pub enqueued_at: Timestamp,
    pub run_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub deadline_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl JobRow {
    pub fn state(&self) -> Result<JobState, StoreError> {
        JobState::from_id(self.state_id).ok_or_else(|| {
            StoreError::Rejected(format!(
                "job {} has unknown state_id {}",
                self.id, self.state_id
            ))
        })
    }

    pub fn policy(&self) -> JobPolicy {
        JobPolicy {
            max_retry: count(self.max_retry),
            timeout: millis(self.timeout_ms),
            retention: millis(self.retention_ms),
        }
    }

    pub fn into_record(self) -> Result<JobRecord, StoreError> {
        let state = self.state()?;
        Ok(JobRecord {
            id: self.id,
            queue: self.queue,
            job_type: self.job_type,
            state,
            retried: count(self.retried),
            max_retry: count(self.max_retry),
            last_error: self.last_error,
            enqueued_at: self.enqueued_at,
            completed_at: self.completed_at,
            result: self.result,
        })
    }

    pub fn into_claimed(self) -> ClaimedJob {
        let policy = self.policy();
        ClaimedJob {
            id: self.id,
            queue: self.queue,
            envelope: JobEnvelope {
                job_type: self.job_type,
                payload: self.payload,
            },
            policy,
            retried: count(self.retried),
        }
    }
}

/// Convert a duration to the BIGINT millisecond columns, saturating.
pub fn to_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

fn count(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}
