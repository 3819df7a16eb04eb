#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use lumen_core::error::JobError;
use lumen_core::job::{ClaimedJob, JobPolicy};
use lumen_core::store::MemoryJobStore;
use lumen_core::txt2img::{TextToImageRequest, TextToImageResponse, JOB_TYPE_TXT2IMG};
use lumen_queue::backoff::RetryBackoff;
use lumen_queue::config::{AdmissionPolicy, DispatcherConfig, SubmitterConfig};
use lumen_queue::weights::QueueWeights;
use lumen_queue::{
    Dispatcher, HandlerError, HandlerRegistry, HandlerResult, JobHandler, ResultWaiter, Submitter,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use lumen_api::config::ServerConfig;
use lumen_api::router::build_app_router;
use lumen_api::state::AppState;

pub const QUEUE: &str = "txt2img";

/// Stand-in for the image service, steered by the request prompt.
///
/// - `fail`: retryable upstream error
/// - `reject`: non-retryable validation error
/// - anything else: one image with seed 1 and subseed 2
struct StubImageHandler;

#[async_trait]
impl JobHandler for StubImageHandler {
    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        let request: TextToImageRequest = serde_json::from_slice(&job.envelope.payload)
            .map_err(|e| HandlerError::Skip(JobError::Validation(e.to_string())))?;
        match request.prompt.as_str() {
            "fail" => Err(HandlerError::Retry(JobError::Upstream("model crashed".into()))),
            "reject" => Err(HandlerError::Skip(JobError::Validation("prompt rejected".into()))),
            _ => Ok(serde_json::to_vec(&TextToImageResponse {
                images: vec!["AA==".into()],
                seeds: vec![1],
                subseeds: vec![2],
            })
            .unwrap()),
        }
    }
}

pub struct TestOptions {
    pub max_pending: Option<u64>,
    pub wait_timeout: Duration,
    /// When false no worker runs, so every job stays pending.
    pub run_dispatcher: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            max_pending: None,
            wait_timeout: Duration::from_secs(5),
            run_dispatcher: true,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    cancel: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(wait_timeout: Duration) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        wait_timeout,
        wait_poll_interval: Duration::from_millis(10),
    }
}

/// Build the full application router over an in-memory store, with a
/// dispatcher running the stub image handler.
pub fn spawn_app(options: TestOptions) -> TestApp {
    let store = Arc::new(MemoryJobStore::new());
    let cancel = CancellationToken::new();

    if options.run_dispatcher {
        let mut registry = HandlerRegistry::new();
        registry
            .register(JOB_TYPE_TXT2IMG, Arc::new(StubImageHandler))
            .unwrap();
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(registry),
            DispatcherConfig {
                concurrency: 4,
                queues: QueueWeights::single(QUEUE),
                poll_interval: Duration::from_millis(10),
                backoff: RetryBackoff::IMMEDIATE,
                shutdown_timeout: Duration::from_secs(1),
            },
        );
        let run_cancel = cancel.clone();
        tokio::spawn(async move { dispatcher.run(run_cancel).await });
    }

    let config = test_config(options.wait_timeout);
    let submit = SubmitterConfig {
        queue: QUEUE.into(),
        policy: Some(JobPolicy {
            max_retry: 1,
            timeout: Duration::from_secs(5),
            retention: Duration::from_secs(60),
        }),
        admission: AdmissionPolicy {
            max_pending: options.max_pending,
        },
    };
    let state = AppState {
        store: store.clone(),
        submitter: Submitter::new(store.clone(), submit),
        waiter: ResultWaiter::with_poll_interval(store.clone(), config.wait_poll_interval),
        config: Arc::new(config.clone()),
        shutdown: cancel.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        cancel,
    }
}

pub async fn post_json(app: &TestApp, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
