//! HTTP facade over the job queue.
//!
//! `POST /sdapi/v1/txt2img` submits a job and holds the request open until
//! the job finishes, so clients see the image service's own request/response
//! shape while the work runs on the worker pool.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
