//! Repository for the `jobs` table.
//!
//! Uses `JobState` ids for every state literal. Claims use
//! `SELECT FOR UPDATE SKIP LOCKED` so concurrent dispatchers never receive
//! the same job.

use lumen_core::job::{JobEnvelope, JobPolicy, JobState, StateId};
use lumen_core::types::{JobId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{to_millis, JobRow};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, queue, job_type, state_id, payload, result, \
    max_retry, retried, timeout_ms, retention_ms, last_error, \
    enqueued_at, run_at, started_at, deadline_at, completed_at, expires_at";

/// Provides the state transitions of queued jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job, eligible immediately.
    pub async fn insert(
        pool: &PgPool,
        id: JobId,
        queue: &str,
        envelope: &JobEnvelope,
        policy: &JobPolicy,
    ) -> Result<JobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                 (id, queue, job_type, state_id, payload, max_retry, timeout_ms, retention_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(queue)
            .bind(&envelope.job_type)
            .bind(JobState::Pending.id())
            .bind(&envelope.payload)
            .bind(i32::try_from(policy.max_retry).unwrap_or(i32::MAX))
            .bind(to_millis(policy.timeout))
            .bind(to_millis(policy.retention))
            .fetch_one(pool)
            .await
    }

    /// Find a job by queue and id.
    pub async fn find(
        pool: &PgPool,
        queue: &str,
        id: JobId,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND queue = $2");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(queue)
            .fetch_optional(pool)
            .await
    }

    /// Current state of a job, regardless of queue.
    pub async fn find_state(pool: &PgPool, id: JobId) -> Result<Option<StateId>, sqlx::Error> {
        sqlx::query_scalar::<_, StateId>("SELECT state_id FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count pending and retrying jobs in a queue.
    pub async fn count_waiting(pool: &PgPool, queue: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE queue = $1 AND state_id IN ($2, $3)",
        )
        .bind(queue)
        .bind(JobState::Pending.id())
        .bind(JobState::Retrying.id())
        .fetch_one(pool)
        .await
    }

    /// Atomically claim the oldest eligible job in a queue.
    ///
    /// Sets `started_at` and the per-attempt `deadline_at` from the job's
    /// own timeout.
    pub async fn claim_next(pool: &PgPool, queue: &str) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET state_id = $2, started_at = NOW(), \
                 deadline_at = NOW() + timeout_ms * INTERVAL '1 millisecond', \
                 updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE queue = $1 AND state_id IN ($3, $4) AND run_at <= NOW() \
                 ORDER BY run_at ASC, enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(queue)
            .bind(JobState::Running.id())
            .bind(JobState::Pending.id())
            .bind(JobState::Retrying.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a running job completed with its result.
    ///
    /// Returns `false` if the job is not running.
    pub async fn complete(pool: &PgPool, id: JobId, result: &[u8]) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE jobs \
             SET state_id = $2, result = $3, completed_at = NOW(), deadline_at = NULL, \
                 expires_at = NOW() + retention_ms * INTERVAL '1 millisecond', \
                 updated_at = NOW() \
             WHERE id = $1 AND state_id = $4",
        )
        .bind(id)
        .bind(JobState::Completed.id())
        .bind(result)
        .bind(JobState::Running.id())
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Charge a failed attempt to a running job.
    ///
    /// The job goes back to `retrying` (eligible at `retry_at`) while
    /// `retried < max_retry`, otherwise it becomes `failed`. Returns the new
    /// state id, or `None` if the job is not running.
    pub async fn fail_attempt(
        pool: &PgPool,
        id: JobId,
        error: &str,
        retry_at: Timestamp,
    ) -> Result<Option<StateId>, sqlx::Error> {
        sqlx::query_scalar::<_, StateId>(
            "UPDATE jobs \
             SET retried = retried + 1, last_error = $2, deadline_at = NULL, \
                 state_id = CASE WHEN retried >= max_retry THEN $4 ELSE $5 END, \
                 run_at = CASE WHEN retried >= max_retry THEN run_at ELSE $3 END, \
                 completed_at = CASE WHEN retried >= max_retry THEN NOW() END, \
                 expires_at = CASE WHEN retried >= max_retry \
                     THEN NOW() + retention_ms * INTERVAL '1 millisecond' END, \
                 updated_at = NOW() \
             WHERE id = $1 AND state_id = $6 \
             RETURNING state_id",
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .bind(JobState::Failed.id())
        .bind(JobState::Retrying.id())
        .bind(JobState::Running.id())
        .fetch_optional(pool)
        .await
    }

    /// Mark a running job skipped. Returns `false` if the job is not running.
    pub async fn skip(pool: &PgPool, id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE jobs \
             SET state_id = $2, last_error = $3, completed_at = NOW(), deadline_at = NULL, \
                 expires_at = NOW() + retention_ms * INTERVAL '1 millisecond', \
                 updated_at = NOW() \
             WHERE id = $1 AND state_id = $4",
        )
        .bind(id)
        .bind(JobState::Skipped.id())
        .bind(error)
        .bind(JobState::Running.id())
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Delete terminal jobs whose retention window has elapsed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM jobs WHERE expires_at IS NOT NULL AND expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Charge one attempt to running jobs more than `grace_ms` past their
    /// deadline, re-queueing them immediately or failing them.
    pub async fn recover_stale(
        pool: &PgPool,
        error: &str,
        grace_ms: i64,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE jobs \
             SET retried = retried + 1, last_error = $1, deadline_at = NULL, \
                 state_id = CASE WHEN retried >= max_retry THEN $3 ELSE $4 END, \
                 run_at = NOW(), \
                 completed_at = CASE WHEN retried >= max_retry THEN NOW() END, \
                 expires_at = CASE WHEN retried >= max_retry \
                     THEN NOW() + retention_ms * INTERVAL '1 millisecond' END, \
                 updated_at = NOW() \
             WHERE state_id = $5 \
               AND deadline_at + $2 * INTERVAL '1 millisecond' < NOW()",
        )
        .bind(error)
        .bind(grace_ms)
        .bind(JobState::Failed.id())
        .bind(JobState::Retrying.id())
        .bind(JobState::Running.id())
        .execute(pool)
        .await?;
        Ok(done.rows_affected())
    }
}
