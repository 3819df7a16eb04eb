//! Process-local [`JobStore`] backed by a mutex-guarded map.
//!
//! Jobs do not survive a restart, so this store is only suitable for tests
//! and single-process development setups.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::JobStore;
use crate::error::StoreError;
use crate::job::{
    ClaimedJob, JobEnvelope, JobHandle, JobPolicy, JobRecord, JobState, RetryOutcome,
};
use crate::types::{offset, JobId, Timestamp};

/// Error recorded when a job outlives its execution deadline.
const STALE_ERROR: &str = "execution deadline exceeded (worker lost)";

struct Entry {
    record: JobRecord,
    envelope: JobEnvelope,
    policy: JobPolicy,
    /// Insertion order, used to break ties between equal `run_at`.
    seq: u64,
    run_at: Timestamp,
    deadline_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn finish(&mut self, state: JobState, now: Timestamp) {
        self.record.state = state;
        self.record.completed_at = Some(now);
        self.deadline_at = None;
        self.expires_at = Some(offset(now, self.policy.retention));
    }

    /// Charge a failed attempt and re-queue or fail the job.
    fn fail_attempt(&mut self, error: &str, retry_at: Timestamp, now: Timestamp) -> RetryOutcome {
        let exhausted = self.record.retried >= self.policy.max_retry;
        self.record.retried += 1;
        self.record.last_error = Some(error.to_string());
        if exhausted {
            self.finish(JobState::Failed, now);
            RetryOutcome::Exhausted
        } else {
            self.record.state = JobState::Retrying;
            self.deadline_at = None;
            self.run_at = retry_at;
            RetryOutcome::Requeued { retry_at }
        }
    }
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Entry>,
    next_seq: u64,
}

/// In-memory job store.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn running_entry<'a>(
    jobs: &'a mut HashMap<JobId, Entry>,
    id: JobId,
) -> Result<&'a mut Entry, StoreError> {
    let entry = jobs.get_mut(&id).ok_or_else(|| StoreError::NotFound {
        queue: String::new(),
        id,
    })?;
    if entry.record.state != JobState::Running {
        return Err(StoreError::InvalidTransition {
            id,
            state: entry.record.state.as_str(),
        });
    }
    Ok(entry)
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(
        &self,
        queue: &str,
        envelope: &JobEnvelope,
        policy: &JobPolicy,
    ) -> Result<JobHandle, StoreError> {
        let now = Utc::now();
        let id = JobId::now_v7();
        let mut inner = self.inner.lock().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            id,
            Entry {
                record: JobRecord {
                    id,
                    queue: queue.to_string(),
                    job_type: envelope.job_type.clone(),
                    state: JobState::Pending,
                    retried: 0,
                    max_retry: policy.max_retry,
                    last_error: None,
                    enqueued_at: now,
                    completed_at: None,
                    result: None,
                },
                envelope: envelope.clone(),
                policy: *policy,
                seq,
                run_at: now,
                deadline_at: None,
                expires_at: None,
            },
        );
        Ok(JobHandle {
            queue: queue.to_string(),
            id,
        })
    }

    async fn get_record(&self, handle: &JobHandle) -> Result<JobRecord, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .get(&handle.id)
            .filter(|e| e.record.queue == handle.queue)
            .map(|e| e.record.clone())
            .ok_or_else(|| StoreError::NotFound {
                queue: handle.queue.clone(),
                id: handle.id,
            })
    }

    async fn pending_count(&self, queue: &str) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .filter(|e| e.record.queue == queue && e.record.state.is_claimable())
            .count() as u64)
    }

    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let next = inner
            .jobs
            .values()
            .filter(|e| {
                e.record.queue == queue && e.record.state.is_claimable() && e.run_at <= now
            })
            .min_by_key(|e| (e.run_at, e.seq))
            .map(|e| e.record.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(entry) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        entry.record.state = JobState::Running;
        entry.deadline_at = Some(offset(now, entry.policy.timeout));
        Ok(Some(ClaimedJob {
            id,
            queue: entry.record.queue.clone(),
            envelope: entry.envelope.clone(),
            policy: entry.policy,
            retried: entry.record.retried,
        }))
    }

    async fn complete(&self, id: JobId, result: &[u8]) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let entry = running_entry(&mut inner.jobs, id)?;
        entry.record.result = Some(result.to_vec());
        entry.finish(JobState::Completed, now);
        Ok(())
    }

    async fn retry(
        &self,
        id: JobId,
        error: &str,
        retry_at: Timestamp,
    ) -> Result<RetryOutcome, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let entry = running_entry(&mut inner.jobs, id)?;
        Ok(entry.fail_attempt(error, retry_at, now))
    }

    async fn skip(&self, id: JobId, error: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let entry = running_entry(&mut inner.jobs, id)?;
        entry.record.last_error = Some(error.to_string());
        entry.finish(JobState::Skipped, now);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let before = inner.jobs.len();
        inner
            .jobs
            .retain(|_, e| e.expires_at.map_or(true, |at| at > now));
        Ok((before - inner.jobs.len()) as u64)
    }

    async fn recover_stale(&self, grace: Duration) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let mut recovered = 0;
        for entry in inner.jobs.values_mut() {
            let stale = entry.record.state == JobState::Running
                && entry.deadline_at.is_some_and(|d| offset(d, grace) < now);
            if stale {
                entry.fail_attempt(STALE_ERROR, now, now);
                recovered += 1;
            }
        }
        Ok(recovered)
    }
}
