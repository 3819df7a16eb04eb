//! Wire types for the txt2img response body.
//!
//! The service returns the generated images alongside an `info` field that
//! is itself a JSON document encoded as a string, so decoding happens in
//! two steps.

use lumen_core::txt2img::TextToImageResponse;
use serde::Deserialize;

/// Outer body returned by `POST /sdapi/v1/txt2img`.
#[derive(Debug, Deserialize)]
pub struct Txt2ImgBody {
    /// Base64-encoded images.
    pub images: Vec<String>,
    /// JSON-encoded [`GenerationInfo`].
    pub info: String,
}

/// Generation metadata embedded in [`Txt2ImgBody::info`].
#[derive(Debug, Deserialize)]
pub struct GenerationInfo {
    pub seed: i64,
    pub all_seeds: Vec<i64>,
    pub all_subseeds: Vec<i64>,
}

/// Which decoding step rejected the body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid response body: {0}")]
    Body(serde_json::Error),

    #[error("invalid info document: {0}")]
    Info(serde_json::Error),
}

/// Decode a raw response body into a [`TextToImageResponse`].
///
/// Images keep their upstream order; seeds and subseeds come from
/// `all_seeds` / `all_subseeds` in the same order.
pub fn parse_txt2img(body: &[u8]) -> Result<TextToImageResponse, DecodeError> {
    let outer: Txt2ImgBody = serde_json::from_slice(body).map_err(DecodeError::Body)?;
    let info: GenerationInfo = serde_json::from_str(&outer.info).map_err(DecodeError::Info)?;
    Ok(TextToImageResponse {
        images: outer.images,
        seeds: info.all_seeds,
        subseeds: info.all_subseeds,
    })
}
