//! Background worker pool.
//!
//! Claims jobs from the configured queues in weighted random order and runs
//! up to `concurrency` of them at once, each under its own execution
//! timeout. Outcomes are written back to the store:
//!
//! - handler success: completed with the handler's result
//! - [`HandlerError::Skip`] or no registered handler: skipped
//! - [`HandlerError::Retry`] or timeout: re-queued after backoff, or failed
//!   once the retry budget is spent

use std::sync::Arc;

use chrono::Utc;
use lumen_core::error::StoreError;
use lumen_core::job::{ClaimedJob, RetryOutcome};
use lumen_core::store::JobStore;
use lumen_core::types::offset;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backoff::RetryBackoff;
use crate::config::DispatcherConfig;
use crate::handler::{HandlerError, HandlerRegistry};

/// Worker pool bound to one store and one handler registry.
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run until `cancel` fires, then wait up to the shutdown timeout for
    /// in-flight jobs. Jobs still running after that are aborted and left
    /// for stale recovery.
    pub async fn run(&self, cancel: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        tracing::info!(
            concurrency = self.config.concurrency,
            queues = ?self.config.queues.names().collect::<Vec<_>>(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Job dispatcher started",
        );

        loop {
            while let Some(joined) = tasks.try_join_next() {
                log_join_error(joined);
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.claim_next().await {
                Ok(Some(job)) => {
                    let store = Arc::clone(&self.store);
                    let registry = Arc::clone(&self.registry);
                    let backoff = self.config.backoff;
                    tasks.spawn(async move {
                        execute(store.as_ref(), &registry, backoff, job).await;
                        drop(permit);
                    });
                    continue;
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    tracing::error!(error = %e, "Failed to claim job");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!(in_flight = tasks.len(), "Job dispatcher shutting down");
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                log_join_error(joined);
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            tracing::warn!(
                aborted = tasks.len(),
                "Shutdown timeout reached, aborting in-flight jobs",
            );
            tasks.shutdown().await;
        }
        tracing::info!("Job dispatcher stopped");
    }

    /// Try each queue once, in weighted random order.
    async fn claim_next(&self) -> Result<Option<ClaimedJob>, StoreError> {
        let order = {
            let mut rng = rand::rng();
            self.config.queues.claim_order(&mut rng)
        };
        for queue in order {
            if let Some(job) = self.store.claim(queue).await? {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Job task panicked");
        }
    }
}

/// How one attempt ended, before it is written back.
enum Attempt {
    Done(Vec<u8>),
    Skip(String),
    Retry(String),
}

/// Run one claimed job to an outcome and record it.
pub async fn execute(
    store: &dyn JobStore,
    registry: &HandlerRegistry,
    backoff: RetryBackoff,
    job: ClaimedJob,
) {
    let attempt = run_attempt(registry, &job).await;

    let written = match attempt {
        Attempt::Done(result) => store.complete(job.id, &result).await.map(|()| {
            tracing::info!(
                job_id = %job.id,
                job_type = %job.envelope.job_type,
                attempt = job.retried + 1,
                "Job completed",
            );
        }),
        Attempt::Skip(error) => store.skip(job.id, &error).await.map(|()| {
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.envelope.job_type,
                error = %error,
                "Job skipped",
            );
        }),
        Attempt::Retry(error) => {
            let retry_at = offset(Utc::now(), backoff.delay(job.retried));
            store
                .retry(job.id, &error, retry_at)
                .await
                .map(|outcome| match outcome {
                    RetryOutcome::Requeued { retry_at } => tracing::warn!(
                        job_id = %job.id,
                        job_type = %job.envelope.job_type,
                        attempt = job.retried + 1,
                        retry_at = %retry_at,
                        error = %error,
                        "Job attempt failed, retrying",
                    ),
                    RetryOutcome::Exhausted => tracing::error!(
                        job_id = %job.id,
                        job_type = %job.envelope.job_type,
                        attempts = job.retried + 1,
                        error = %error,
                        "Job failed permanently",
                    ),
                })
        }
    };

    if let Err(e) = written {
        // The job stays running until stale recovery picks it up.
        tracing::error!(job_id = %job.id, error = %e, "Failed to record job outcome");
    }
}

async fn run_attempt(registry: &HandlerRegistry, job: &ClaimedJob) -> Attempt {
    let handler = match registry.resolve(&job.envelope.job_type) {
        Ok(handler) => handler,
        Err(e) => return Attempt::Skip(e.to_string()),
    };

    tracing::debug!(
        job_id = %job.id,
        job_type = %job.envelope.job_type,
        attempt = job.retried + 1,
        "Running job",
    );

    match tokio::time::timeout(job.policy.timeout, handler.handle(job)).await {
        Ok(Ok(result)) => Attempt::Done(result),
        Ok(Err(HandlerError::Skip(e))) => Attempt::Skip(e.to_string()),
        Ok(Err(HandlerError::Retry(e))) => Attempt::Retry(e.to_string()),
        Err(_) => Attempt::Retry(format!(
            "execution exceeded timeout of {:?}",
            job.policy.timeout
        )),
    }
}
