//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use lumen_api::error::AppError;
use lumen_core::error::{JobError, StoreError};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: validation errors map to 400 and keep their message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Job(JobError::Validation("txt2img request is null".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["error_description"], "Invalid request: txt2img request is null");
}

// ---------------------------------------------------------------------------
// Test: decoding and encoding errors are client errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn codec_errors_return_400() {
    for err in [
        JobError::Decoding("truncated".into()),
        JobError::Encoding("not serializable".into()),
    ] {
        let (status, _) = error_to_response(AppError::Job(err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

// ---------------------------------------------------------------------------
// Test: overload maps to 503
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overloaded_returns_503() {
    let err = AppError::Job(JobError::Overloaded {
        queue: "txt2img".into(),
        pending: 50,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "service_unavailable");
}

// ---------------------------------------------------------------------------
// Test: wait timeout maps to 504
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeout_returns_504() {
    let err = AppError::Job(JobError::Timeout("job did not finish within 180s".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "gateway_timeout");
}

// ---------------------------------------------------------------------------
// Test: failed jobs and upstream errors map to 502
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_job_returns_502() {
    let (status, json) = error_to_response(AppError::JobFailed("upstream down".into())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "bad_gateway");

    let (status, _) =
        error_to_response(AppError::Job(JobError::Upstream("connection refused".into()))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ---------------------------------------------------------------------------
// Test: store errors are 500 with a sanitized message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_error_is_sanitized() {
    let err = AppError::Job(JobError::Store(StoreError::Unavailable(
        "connection to 10.0.0.5:5432 refused".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal_server_error");
    assert_eq!(json["error_description"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: malformed request bodies map to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("expected value".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_description"], "expected value");
}
