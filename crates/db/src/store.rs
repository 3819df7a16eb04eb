//! Durable [`JobStore`] over the `jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use lumen_core::error::StoreError;
use lumen_core::job::{ClaimedJob, JobEnvelope, JobHandle, JobPolicy, JobRecord, JobState, RetryOutcome};
use lumen_core::store::JobStore;
use lumen_core::types::{JobId, Timestamp};

use crate::models::job::to_millis;
use crate::repositories::JobRepo;
use crate::DbPool;

/// Error recorded on jobs recovered from a lost worker.
const STALE_ERROR: &str = "execution deadline exceeded (worker lost)";

/// Postgres-backed job store. Cheap to clone.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Explain why a transition on `id` matched no running row.
    async fn not_running(&self, id: JobId) -> StoreError {
        match JobRepo::find_state(&self.pool, id).await {
            Ok(Some(state_id)) => StoreError::InvalidTransition {
                id,
                state: JobState::from_id(state_id).map_or("unknown", JobState::as_str),
            },
            Ok(None) => StoreError::NotFound {
                queue: String::new(),
                id,
            },
            Err(e) => store_error(e),
        }
    }
}

/// Classify a sqlx error: connectivity problems are `Unavailable`,
/// everything else is a rejected operation.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        other => {
            tracing::error!(error = %other, "Job store query failed");
            StoreError::Rejected(other.to_string())
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn enqueue(
        &self,
        queue: &str,
        envelope: &JobEnvelope,
        policy: &JobPolicy,
    ) -> Result<JobHandle, StoreError> {
        let row = JobRepo::insert(&self.pool, JobId::now_v7(), queue, envelope, policy)
            .await
            .map_err(store_error)?;
        Ok(JobHandle {
            queue: row.queue,
            id: row.id,
        })
    }

    async fn get_record(&self, handle: &JobHandle) -> Result<JobRecord, StoreError> {
        JobRepo::find(&self.pool, &handle.queue, handle.id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound {
                queue: handle.queue.clone(),
                id: handle.id,
            })?
            .into_record()
    }

    async fn pending_count(&self, queue: &str) -> Result<u64, StoreError> {
        let count = JobRepo::count_waiting(&self.pool, queue)
            .await
            .map_err(store_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, StoreError> {
        let row = JobRepo::claim_next(&self.pool, queue)
            .await
            .map_err(store_error)?;
        Ok(row.map(|r| r.into_claimed()))
    }

    async fn complete(&self, id: JobId, result: &[u8]) -> Result<(), StoreError> {
        if JobRepo::complete(&self.pool, id, result)
            .await
            .map_err(store_error)?
        {
            Ok(())
        } else {
            Err(self.not_running(id).await)
        }
    }

    async fn retry(
        &self,
        id: JobId,
        error: &str,
        retry_at: Timestamp,
    ) -> Result<RetryOutcome, StoreError> {
        let state_id = JobRepo::fail_attempt(&self.pool, id, error, retry_at)
            .await
            .map_err(store_error)?;
        match state_id.and_then(JobState::from_id) {
            Some(JobState::Retrying) => Ok(RetryOutcome::Requeued { retry_at }),
            Some(_) => Ok(RetryOutcome::Exhausted),
            None => Err(self.not_running(id).await),
        }
    }

    async fn skip(&self, id: JobId, error: &str) -> Result<(), StoreError> {
        if JobRepo::skip(&self.pool, id, error)
            .await
            .map_err(store_error)?
        {
            Ok(())
        } else {
            Err(self.not_running(id).await)
        }
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        JobRepo::delete_expired(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn recover_stale(&self, grace: Duration) -> Result<u64, StoreError> {
        JobRepo::recover_stale(&self.pool, STALE_ERROR, to_millis(grace))
            .await
            .map_err(store_error)
    }
}
