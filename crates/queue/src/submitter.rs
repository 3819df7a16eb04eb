//! Turns typed requests into durable jobs.

use std::sync::Arc;

use lumen_core::error::JobError;
use lumen_core::job::{JobEnvelope, JobHandle, JobKind, JobPolicy};
use lumen_core::store::JobStore;

use crate::config::SubmitterConfig;

/// Encodes requests and enqueues them on the configured queue.
#[derive(Clone)]
pub struct Submitter {
    store: Arc<dyn JobStore>,
    config: SubmitterConfig,
}

impl Submitter {
    pub fn new(store: Arc<dyn JobStore>, config: SubmitterConfig) -> Self {
        Self { store, config }
    }

    pub fn queue(&self) -> &str {
        &self.config.queue
    }

    /// Policy for callers that do not need their own: the configured
    /// override, or else the job type's default.
    pub fn policy_for<K: JobKind>(&self) -> JobPolicy {
        self.config.policy.unwrap_or_else(K::default_policy)
    }

    /// Enqueue `request` under `policy`.
    ///
    /// Encoding happens before the store is touched, so an unserializable
    /// request never creates a record. With admission control enabled, a
    /// queue at capacity rejects the job with [`JobError::Overloaded`].
    pub async fn submit<K: JobKind>(
        &self,
        request: &K,
        policy: &JobPolicy,
    ) -> Result<JobHandle, JobError> {
        let envelope = JobEnvelope::encode(request)?;
        self.admit().await?;

        let handle = self
            .store
            .enqueue(&self.config.queue, &envelope, policy)
            .await?;

        tracing::info!(
            job_id = %handle.id,
            queue = %handle.queue,
            job_type = %envelope.job_type,
            max_retry = policy.max_retry,
            timeout_secs = policy.timeout.as_secs(),
            "Job enqueued",
        );
        Ok(handle)
    }

    async fn admit(&self) -> Result<(), JobError> {
        let Some(max_pending) = self.config.admission.max_pending else {
            return Ok(());
        };
        let pending = self.store.pending_count(&self.config.queue).await?;
        if pending >= max_pending {
            tracing::warn!(
                queue = %self.config.queue,
                pending,
                max_pending,
                "Queue at capacity, rejecting job",
            );
            return Err(JobError::Overloaded {
                queue: self.config.queue.clone(),
                pending,
            });
        }
        Ok(())
    }
}
