use crate::types::JobId;

/// Failures reported by a [`JobStore`](crate::store::JobStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job not found: {queue}/{id}")]
    NotFound { queue: String, id: JobId },

    /// The job exists but is not in a state that allows the transition
    /// (e.g. completing a job that is no longer running).
    #[error("Job {id} cannot transition from state '{state}'")]
    InvalidTransition { id: JobId, state: &'static str },

    /// The store could not be reached (connection refused, pool exhausted).
    #[error("Job store unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but refused the operation.
    #[error("Job store rejected operation: {0}")]
    Rejected(String),
}

/// Error taxonomy for the job lifecycle.
///
/// Every variant carries a stable machine-readable [`code`](Self::code)
/// and a human-readable message. Diagnostic detail (payloads, URLs)
/// belongs in logs, not in these messages.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The request could not be serialized into a job payload.
    #[error("Failed to encode job payload: {0}")]
    Encoding(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's wait deadline expired (or was cancelled) before the
    /// job reached a terminal state. The job itself is unaffected.
    #[error("Timed out waiting for job result: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// The external compute service was unreachable or returned an error.
    #[error("Image service error: {0}")]
    Upstream(String),

    /// The external compute service returned a body that could not be parsed.
    #[error("Malformed image service response: {0}")]
    Decoding(String),

    #[error("No handler registered for job type '{0}'")]
    UnregisteredHandler(String),

    /// Admission control refused the submission.
    #[error("Queue '{queue}' has {pending} pending jobs")]
    Overloaded { queue: String, pending: u64 },
}

impl JobError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            JobError::Encoding(_) => "encoding_error",
            JobError::Store(StoreError::NotFound { .. }) => "job_not_found",
            JobError::Store(_) => "store_error",
            JobError::Timeout(_) => "timeout",
            JobError::Validation(_) => "validation_error",
            JobError::Upstream(_) => "upstream_error",
            JobError::Decoding(_) => "decoding_error",
            JobError::UnregisteredHandler(_) => "unregistered_handler",
            JobError::Overloaded { .. } => "overloaded",
        }
    }
}
