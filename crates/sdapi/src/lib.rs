//! Client for the external image-generation service.
//!
//! Provides the wire types of the `/sdapi/v1/txt2img` endpoint and an
//! HTTP wrapper that maps transport, status and decoding failures onto
//! the job error taxonomy.

pub mod api;
pub mod messages;

pub use api::{SdApi, SdApiError};
