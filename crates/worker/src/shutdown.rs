//! Bounded joins for background tasks during shutdown.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Wait up to `limit` for `handle`. Returns `true` only when the task
/// stopped cleanly; a panic or an overrun is logged and returns `false`.
pub async fn join_within(task: &'static str, handle: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(task, error = %e, "Background task failed");
            false
        }
        Err(_) => {
            tracing::warn!(
                task,
                limit_secs = limit.as_secs(),
                "Background task did not stop in time",
            );
            false
        }
    }
}
