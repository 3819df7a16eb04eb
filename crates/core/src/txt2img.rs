//! Text-to-image request and response types.
//!
//! Field names are the wire names of the image service's
//! `/sdapi/v1/txt2img` endpoint, so a request round-trips unchanged from
//! the inbound facade, through the job payload, to the upstream call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::job::{JobKind, JobPolicy};

/// Type tag for text-to-image jobs.
pub const JOB_TYPE_TXT2IMG: &str = "text:image";

/// Default queue text-to-image jobs are submitted to.
pub const DEFAULT_QUEUE: &str = "txt2img";

/// A text-to-image generation request.
///
/// Missing fields decode to their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: i32,
    pub height: i32,
    pub restore_faces: bool,
    pub enable_hr: bool,
    pub hr_resize_x: i32,
    pub hr_resize_y: i32,
    pub denoising_strength: f64,
    pub batch_size: i32,
    /// `-1` asks the service for a random seed.
    pub seed: i64,
    pub subseed: i64,
    pub subseed_strength: f64,
    pub sampler_name: String,
    pub cfg_scale: f64,
    pub steps: i32,
    pub n_iter: i32,
}

impl JobKind for TextToImageRequest {
    const JOB_TYPE: &'static str = JOB_TYPE_TXT2IMG;

    fn default_policy() -> JobPolicy {
        JobPolicy {
            max_retry: 5,
            timeout: Duration::from_secs(20 * 60),
            retention: Duration::ZERO,
        }
    }
}

/// Generated images with the seeds that produced them.
///
/// `images[i]`, `seeds[i]` and `subseeds[i]` describe the same image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextToImageResponse {
    /// Base64-encoded images, in upstream output order.
    pub images: Vec<String>,
    pub seeds: Vec<i64>,
    pub subseeds: Vec<i64>,
}
