//! Job handlers and the type-tag registry the dispatcher routes through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lumen_core::error::JobError;
use lumen_core::job::ClaimedJob;

/// Failure of a single handler attempt, tagged with whether the
/// dispatcher may try again.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Re-queue the job if its retry budget allows.
    #[error("{0}")]
    Retry(JobError),

    /// Never re-attempt; the job is marked skipped.
    #[error("{0}")]
    Skip(JobError),
}

impl HandlerError {
    pub fn error(&self) -> &JobError {
        match self {
            HandlerError::Retry(e) | HandlerError::Skip(e) => e,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retry(_))
    }
}

/// Serialized handler output on success.
pub type HandlerResult = Result<Vec<u8>, HandlerError>;

/// Business logic for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &ClaimedJob) -> HandlerResult;
}

/// Returned when a second handler is registered for the same type tag.
#[derive(Debug, thiserror::Error)]
#[error("A handler is already registered for job type '{0}'")]
pub struct DuplicateHandler(pub String);

/// Mapping from type tag to handler, populated at startup and read-only
/// afterwards.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `job_type`. Each type has exactly one handler.
    pub fn register(
        &mut self,
        job_type: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), DuplicateHandler> {
        let job_type = job_type.into();
        if self.handlers.contains_key(&job_type) {
            return Err(DuplicateHandler(job_type));
        }
        self.handlers.insert(job_type, handler);
        Ok(())
    }

    /// Look up the handler for `job_type`.
    pub fn resolve(&self, job_type: &str) -> Result<Arc<dyn JobHandler>, JobError> {
        self.handlers
            .get(job_type)
            .cloned()
            .ok_or_else(|| JobError::UnregisteredHandler(job_type.to_string()))
    }

    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
