use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lumen_core::error::JobError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Responses carry `{"error": <code>, "error_description": <message>}`,
/// where `code` is the snake-cased HTTP reason phrase.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A job lifecycle error from submission or waiting.
    #[error(transparent)]
    Job(#[from] JobError),

    /// The request body could not be read as a txt2img request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job ran out of retries.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// The job was rejected by its handler and never retried.
    #[error("Job skipped: {0}")]
    JobSkipped(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Job(job) => classify_job_error(job),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::JobFailed(msg) => {
                (StatusCode::BAD_GATEWAY, format!("Image generation failed: {msg}"))
            }
            AppError::JobSkipped(msg) => {
                (StatusCode::BAD_REQUEST, format!("Request was rejected: {msg}"))
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        let body = json!({
            "error": status_code_name(status),
            "error_description": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a [`JobError`] onto an HTTP status and client-safe message.
///
/// Store and routing failures are logged and replaced with a generic
/// message.
fn classify_job_error(err: &JobError) -> (StatusCode, String) {
    match err {
        JobError::Encoding(_) | JobError::Validation(_) | JobError::Decoding(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        JobError::Overloaded { .. } => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        JobError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        JobError::Upstream(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        JobError::Store(_) | JobError::UnregisteredHandler(_) => {
            tracing::error!(error = %err, code = err.code(), "Job lifecycle error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

/// `Service Unavailable` becomes `service_unavailable`.
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown")
        .to_ascii_lowercase()
        .replace(' ', "_")
}
