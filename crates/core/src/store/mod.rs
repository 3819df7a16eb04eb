//! The durable job store contract.
//!
//! Submitters, result waiters and dispatchers all share one store
//! (`Arc<dyn JobStore>`). The store owns every state transition of a job
//! record and serializes concurrent transitions on the same record.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::job::{ClaimedJob, JobEnvelope, JobHandle, JobPolicy, JobRecord, RetryOutcome};
use crate::types::{JobId, Timestamp};

pub use memory::MemoryJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Durably insert a pending job.
    async fn enqueue(
        &self,
        queue: &str,
        envelope: &JobEnvelope,
        policy: &JobPolicy,
    ) -> Result<JobHandle, StoreError>;

    /// Look up a job. Fails with [`StoreError::NotFound`] once the job has
    /// been garbage-collected or if it never existed.
    async fn get_record(&self, handle: &JobHandle) -> Result<JobRecord, StoreError>;

    /// Number of jobs in `queue` still waiting to run (pending or retrying).
    async fn pending_count(&self, queue: &str) -> Result<u64, StoreError>;

    /// Atomically move the oldest eligible job in `queue` to running.
    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, StoreError>;

    /// Record a successful attempt and its result.
    async fn complete(&self, id: JobId, result: &[u8]) -> Result<(), StoreError>;

    /// Record a failed attempt. The store re-queues the job for `retry_at`
    /// if budget remains, otherwise marks it failed.
    async fn retry(
        &self,
        id: JobId,
        error: &str,
        retry_at: Timestamp,
    ) -> Result<RetryOutcome, StoreError>;

    /// Record a non-retryable failure.
    async fn skip(&self, id: JobId, error: &str) -> Result<(), StoreError>;

    /// Delete terminal jobs whose retention window has elapsed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    /// Charge one attempt to jobs still running more than `grace` past their
    /// execution deadline (their dispatcher died) and re-queue or fail them.
    async fn recover_stale(&self, grace: Duration) -> Result<u64, StoreError>;
}
