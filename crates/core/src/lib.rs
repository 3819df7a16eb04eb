//! Shared job model for the lumen txt2img queue.
//!
//! Holds the job envelope/record types, the text-to-image request and
//! response, the error taxonomy, and the [`JobStore`](store::JobStore)
//! contract every other crate is written against.

pub mod env;
pub mod error;
pub mod job;
pub mod store;
pub mod txt2img;
pub mod types;
