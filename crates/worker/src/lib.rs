//! Worker daemon: executes queued jobs against the image service.

pub mod config;
pub mod handlers;
pub mod shutdown;
