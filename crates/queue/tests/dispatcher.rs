//! End-to-end tests for the dispatcher against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumen_core::error::JobError;
use lumen_core::job::{ClaimedJob, JobEnvelope, JobHandle, JobPolicy, JobRecord, JobState};
use lumen_core::store::{JobStore, MemoryJobStore};
use lumen_queue::backoff::RetryBackoff;
use lumen_queue::config::DispatcherConfig;
use lumen_queue::weights::QueueWeights;
use lumen_queue::{Dispatcher, HandlerError, HandlerRegistry, HandlerResult, JobHandler, ResultWaiter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const QUEUE: &str = "q";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Handler with a scripted outcome that counts invocations.
struct Scripted {
    calls: AtomicUsize,
    delay: Duration,
    outcome: fn(&ClaimedJob) -> HandlerResult,
}

impl Scripted {
    fn new(outcome: fn(&ClaimedJob) -> HandlerResult) -> Arc<Self> {
        Self::slow(Duration::ZERO, outcome)
    }

    fn slow(delay: Duration, outcome: fn(&ClaimedJob) -> HandlerResult) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            outcome,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobHandler for Scripted {
    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)(job)
    }
}

/// Tracks the peak number of concurrent invocations.
#[derive(Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl JobHandler for Gauge {
    async fn handle(&self, _job: &ClaimedJob) -> HandlerResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

struct Harness {
    store: Arc<MemoryJobStore>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Harness {
    fn start(registry: HandlerRegistry, concurrency: usize) -> Self {
        let store = Arc::new(MemoryJobStore::new());
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(registry),
            DispatcherConfig {
                concurrency,
                queues: QueueWeights::single(QUEUE),
                poll_interval: Duration::from_millis(10),
                backoff: RetryBackoff::IMMEDIATE,
                shutdown_timeout: Duration::from_secs(5),
            },
        );
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.run(cancel).await })
        };
        Self {
            store,
            cancel,
            task,
        }
    }

    async fn enqueue(&self, job_type: &str, policy: JobPolicy) -> JobHandle {
        let envelope = JobEnvelope {
            job_type: job_type.into(),
            payload: b"{}".to_vec(),
        };
        self.store.enqueue(QUEUE, &envelope, &policy).await.unwrap()
    }

    async fn wait(&self, handle: &JobHandle) -> JobRecord {
        ResultWaiter::with_poll_interval(self.store.clone(), Duration::from_millis(10))
            .await_result(handle, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap()
    }

    async fn stop(self) {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .unwrap()
            .unwrap();
    }
}

fn policy(max_retry: u32) -> JobPolicy {
    JobPolicy {
        max_retry,
        timeout: Duration::from_secs(5),
        retention: Duration::from_secs(60),
    }
}

fn registry(job_type: &str, handler: Arc<dyn JobHandler>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(job_type, handler).unwrap();
    registry
}

// ---------------------------------------------------------------------------
// Test: successful handler completes the job with its result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_completes_with_result() {
    let handler = Scripted::new(|job| Ok(job.envelope.payload.clone()));
    let harness = Harness::start(registry("test:echo", handler.clone()), 2);

    let handle = harness.enqueue("test:echo", policy(3)).await;
    let record = harness.wait(&handle).await;

    assert_eq!(record.state, JobState::Completed);
    assert_eq!(record.result.as_deref(), Some(&b"{}"[..]));
    assert!(record.completed_at.is_some());
    assert_eq!(handler.calls(), 1);
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: a job type with no handler is skipped without retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregistered_type_is_skipped() {
    let handler = Scripted::new(|_| Ok(Vec::new()));
    let harness = Harness::start(registry("test:echo", handler.clone()), 2);

    let handle = harness.enqueue("test:unknown", policy(5)).await;
    let record = harness.wait(&handle).await;

    assert_eq!(record.state, JobState::Skipped);
    assert_eq!(record.retried, 0);
    assert!(record.last_error.unwrap().contains("test:unknown"));
    assert_eq!(handler.calls(), 0);
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: retryable failures run max_retry + 1 times, then fail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retries_until_budget_exhausted() {
    let handler = Scripted::new(|_| Err(HandlerError::Retry(JobError::Upstream("down".into()))));
    let harness = Harness::start(registry("test:flaky", handler.clone()), 2);

    let handle = harness.enqueue("test:flaky", policy(2)).await;
    let record = harness.wait(&handle).await;

    assert_eq!(record.state, JobState::Failed);
    assert_eq!(record.retried, 3);
    assert!(record.last_error.unwrap().contains("down"));
    assert_eq!(handler.calls(), 3);
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: skip errors are never retried
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skip_is_final() {
    let handler =
        Scripted::new(|_| Err(HandlerError::Skip(JobError::Validation("null request".into()))));
    let harness = Harness::start(registry("test:bad", handler.clone()), 2);

    let handle = harness.enqueue("test:bad", policy(10)).await;
    let record = harness.wait(&handle).await;

    assert_eq!(record.state, JobState::Skipped);
    assert_eq!(handler.calls(), 1);
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: an attempt that outlives its timeout counts as a retryable failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attempt_timeout_is_retryable_failure() {
    let handler = Scripted::slow(Duration::from_secs(2), |_| Ok(Vec::new()));
    let harness = Harness::start(registry("test:slow", handler.clone()), 2);

    let handle = harness
        .enqueue(
            "test:slow",
            JobPolicy {
                max_retry: 1,
                timeout: Duration::from_millis(50),
                retention: Duration::from_secs(60),
            },
        )
        .await;
    let record = harness.wait(&handle).await;

    assert_eq!(record.state, JobState::Failed);
    assert!(record.last_error.unwrap().contains("timeout"));
    assert_eq!(handler.calls(), 2);
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: no more than `concurrency` jobs run at once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrency_is_bounded() {
    let gauge = Arc::new(Gauge::default());
    let harness = Harness::start(registry("test:gauge", gauge.clone()), 2);

    let mut handles = Vec::new();
    for _ in 0..6 {
        handles.push(harness.enqueue("test:gauge", policy(0)).await);
    }
    for handle in &handles {
        assert_eq!(harness.wait(handle).await.state, JobState::Completed);
    }

    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
    harness.stop().await;
}

// ---------------------------------------------------------------------------
// Test: shutdown lets in-flight jobs finish
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_drains_in_flight_jobs() {
    let handler = Scripted::slow(Duration::from_millis(200), |_| Ok(b"late".to_vec()));
    let harness = Harness::start(registry("test:drain", handler.clone()), 1);

    let handle = harness.enqueue("test:drain", policy(0)).await;
    while handler.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let store = harness.store.clone();
    harness.stop().await;

    let record = store.get_record(&handle).await.unwrap();
    assert_eq!(record.state, JobState::Completed);
    assert_eq!(record.result.as_deref(), Some(&b"late"[..]));
}
