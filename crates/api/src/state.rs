use std::sync::Arc;

use lumen_core::store::JobStore;
use lumen_queue::{ResultWaiter, Submitter};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub submitter: Submitter,
    pub waiter: ResultWaiter,
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown so requests still waiting on a job return
    /// instead of holding the server open.
    pub shutdown: CancellationToken,
}
