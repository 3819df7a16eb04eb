//! Handler for `POST /sdapi/v1/txt2img`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use lumen_core::error::JobError;
use lumen_core::job::{JobRecord, JobState};
use lumen_core::txt2img::{TextToImageRequest, TextToImageResponse};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /sdapi/v1/txt2img
///
/// Submits the request with the configured txt2img policy and waits for
/// the job to finish. The job keeps running if the wait times out.
pub async fn txt2img(
    State(state): State<AppState>,
    payload: Result<Json<Option<TextToImageRequest>>, JsonRejection>,
) -> AppResult<Json<TextToImageResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request =
        request.ok_or_else(|| JobError::Validation("txt2img request is null".into()))?;

    let policy = state.submitter.policy_for::<TextToImageRequest>();
    let handle = state.submitter.submit(&request, &policy).await?;

    let record = state
        .waiter
        .await_result(&handle, state.config.wait_timeout, &state.shutdown)
        .await?;

    into_response(record).map(Json)
}

fn into_response(record: JobRecord) -> AppResult<TextToImageResponse> {
    let last_error = record.last_error.unwrap_or_default();
    match record.state {
        JobState::Completed => {
            let bytes = record.result.unwrap_or_default();
            serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Job(JobError::Decoding(format!("stored job result: {e}")))
            })
        }
        JobState::Failed => Err(AppError::JobFailed(last_error)),
        JobState::Skipped => Err(AppError::JobSkipped(last_error)),
        state => Err(AppError::InternalError(format!(
            "job {} returned in non-terminal state {}",
            record.id,
            state.as_str()
        ))),
    }
}
