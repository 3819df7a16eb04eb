//! HTTP client for the image service's REST API.
//!
//! Wraps `POST /sdapi/v1/txt2img` using [`reqwest`].

use lumen_core::error::JobError;
use lumen_core::txt2img::{TextToImageRequest, TextToImageResponse};
use reqwest::header::CONTENT_TYPE;

use crate::messages::{parse_txt2img, DecodeError};

/// Path of the text-to-image endpoint, relative to the service host.
pub const TXT2IMG_PATH: &str = "/sdapi/v1/txt2img";

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// HTTP client for a single image service instance.
#[derive(Clone)]
pub struct SdApi {
    client: reqwest::Client,
    host: String,
}

/// Errors from the image service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum SdApiError {
    /// The request could not be serialized.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The HTTP request itself failed (connection refused, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Image service error ({status})")]
    Status {
        status: u16,
        /// Raw response body, for logs only.
        body: String,
    },

    /// The service answered 2xx with a body we could not parse.
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

impl From<SdApiError> for JobError {
    fn from(err: SdApiError) -> Self {
        match err {
            SdApiError::Encode(e) => JobError::Encoding(e.to_string()),
            SdApiError::Request(e) => JobError::Upstream(e.without_url().to_string()),
            e @ SdApiError::Status { .. } => JobError::Upstream(e.to_string()),
            SdApiError::Decode(e) => JobError::Decoding(e.to_string()),
        }
    }
}

impl SdApi {
    /// Create a client for the service at `host`, e.g. `http://127.0.0.1:7860`.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), host)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, host: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self { client, host }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn txt2img_url(&self) -> String {
        format!("{}{TXT2IMG_PATH}", self.host)
    }

    /// Generate images for `request`.
    ///
    /// Transport failures log the URL and outgoing payload; decoding
    /// failures log the URL and raw body.
    pub async fn txt2img(
        &self,
        request: &TextToImageRequest,
    ) -> Result<TextToImageResponse, SdApiError> {
        let url = self.txt2img_url();
        let payload = serde_json::to_vec(request)?;

        let response = match self
            .client
            .post(&url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(payload.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    url = %url,
                    payload = %String::from_utf8_lossy(&payload),
                    error = %e,
                    "Image service request failed",
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::error!(
                url = %url,
                status = status.as_u16(),
                body = %body,
                "Image service returned an error status",
            );
            return Err(SdApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_txt2img(&body).map_err(|e| {
            tracing::error!(
                url = %url,
                body = %String::from_utf8_lossy(&body),
                error = %e,
                "Unexpected image service response",
            );
            e.into()
        })
    }
}
