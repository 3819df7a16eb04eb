//! Text-to-image job handler.

use async_trait::async_trait;
use lumen_core::error::JobError;
use lumen_core::job::ClaimedJob;
use lumen_core::txt2img::{TextToImageRequest, TextToImageResponse};
use lumen_queue::{HandlerError, HandlerResult, JobHandler};
use lumen_sdapi::SdApi;

/// Forwards txt2img jobs to the image service.
pub struct Txt2ImgHandler {
    api: SdApi,
}

impl Txt2ImgHandler {
    pub fn new(api: SdApi) -> Self {
        Self { api }
    }

    /// Generate images for `request`. A missing request is a validation
    /// failure and never reaches the service.
    pub async fn text_to_image(
        &self,
        request: Option<&TextToImageRequest>,
    ) -> Result<TextToImageResponse, JobError> {
        let request =
            request.ok_or_else(|| JobError::Validation("txt2img request is null".into()))?;
        Ok(self.api.txt2img(request).await?)
    }
}

#[async_trait]
impl JobHandler for Txt2ImgHandler {
    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        let request: Option<TextToImageRequest> = serde_json::from_slice(&job.envelope.payload)
            .map_err(|e| {
                HandlerError::Skip(JobError::Validation(format!("invalid txt2img payload: {e}")))
            })?;

        let response = self
            .text_to_image(request.as_ref())
            .await
            .map_err(classify)?;

        serde_json::to_vec(&response)
            .map_err(|e| HandlerError::Skip(JobError::Encoding(e.to_string())))
    }
}

/// Upstream and decoding failures may clear up on a later attempt; a bad
/// request will not.
fn classify(err: JobError) -> HandlerError {
    match err {
        JobError::Validation(_) | JobError::Encoding(_) => HandlerError::Skip(err),
        _ => HandlerError::Retry(err),
    }
}
