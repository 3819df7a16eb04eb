use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the job store cannot be queried.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs waiting in the submit queue, when known.
    pub pending_jobs: Option<u64>,
}

/// GET /health -- returns service and job store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending_jobs = match state.store.pending_count(state.submitter.queue()).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the job store");
            None
        }
    };

    Json(HealthResponse {
        status: if pending_jobs.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        pending_jobs,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
