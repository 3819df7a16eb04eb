//! Blocks a caller until its job reaches a terminal state.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::error::JobError;
use lumen_core::job::{JobHandle, JobRecord};
use lumen_core::store::JobStore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default interval between record lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest poll interval a waiter accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls the store for a job's record until it completes.
#[derive(Clone)]
pub struct ResultWaiter {
    store: Arc<dyn JobStore>,
    poll_interval: Duration,
}

impl ResultWaiter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self::with_poll_interval(store, DEFAULT_POLL_INTERVAL)
    }

    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_poll_interval(store: Arc<dyn JobStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait for the job behind `handle` to reach a terminal state.
    ///
    /// The first lookup happens immediately, then once per poll interval.
    /// Returns the terminal record, whatever its state. Fails with
    /// [`JobError::Timeout`] when `timeout` elapses or `cancel` fires, and
    /// with [`JobError::Store`] when the record is missing or the store
    /// fails. The deadline wins over an in-flight lookup.
    pub async fn await_result(
        &self,
        handle: &JobHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JobRecord, JobError> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => return Err(self.deadline_exceeded(handle, timeout, polls)),
                _ = cancel.cancelled() => return Err(cancelled(handle)),
                _ = ticker.tick() => {}
            }

            polls += 1;
            let record = tokio::select! {
                biased;
                _ = &mut deadline => return Err(self.deadline_exceeded(handle, timeout, polls)),
                _ = cancel.cancelled() => return Err(cancelled(handle)),
                record = self.store.get_record(handle) => record?,
            };

            if record.is_complete() {
                tracing::debug!(
                    job_id = %handle.id,
                    state = record.state.as_str(),
                    polls,
                    "Job result ready",
                );
                return Ok(record);
            }
        }
    }

    fn deadline_exceeded(&self, handle: &JobHandle, timeout: Duration, polls: u32) -> JobError {
        tracing::warn!(
            job_id = %handle.id,
            queue = %handle.queue,
            timeout_ms = timeout.as_millis() as u64,
            polls,
            "Gave up waiting for job result",
        );
        JobError::Timeout(format!("job {} did not finish within {timeout:?}", handle.id))
    }
}

fn cancelled(handle: &JobHandle) -> JobError {
    tracing::debug!(job_id = %handle.id, "Wait for job result cancelled");
    JobError::Timeout(format!("wait for job {} was cancelled", handle.id))
}
