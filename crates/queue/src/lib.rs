//! Asynchronous job lifecycle on top of a [`JobStore`](lumen_core::store::JobStore).
//!
//! - [`Submitter`] turns typed requests into enqueued jobs.
//! - [`ResultWaiter`] polls a job until it reaches a terminal state or the
//!   caller's deadline expires.
//! - [`Dispatcher`] is the worker pool: it claims jobs from weighted queues
//!   and routes them through the [`HandlerRegistry`].
//! - [`maintenance`] purges expired records and recovers abandoned jobs.

pub mod backoff;
pub mod config;
pub mod dispatcher;
pub mod handler;
pub mod maintenance;
pub mod submitter;
pub mod waiter;
pub mod weights;

pub use dispatcher::Dispatcher;
pub use handler::{HandlerError, HandlerRegistry, HandlerResult, JobHandler};
pub use submitter::Submitter;
pub use waiter::ResultWaiter;
