//! Periodic store upkeep.
//!
//! Each sweep deletes terminal jobs whose retention window has elapsed and
//! re-queues (or fails) jobs left running by a dispatcher that died.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::error::StoreError;
use lumen_core::store::JobStore;
use tokio_util::sync::CancellationToken;

use crate::config::MaintenanceConfig;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub purged: u64,
    pub recovered: u64,
}

/// Run a single sweep.
pub async fn sweep(store: &dyn JobStore, stale_grace: Duration) -> Result<SweepReport, StoreError> {
    let recovered = store.recover_stale(stale_grace).await?;
    let purged = store.purge_expired().await?;
    Ok(SweepReport { purged, recovered })
}

/// Run the maintenance loop until `cancel` is triggered.
pub async fn run(store: Arc<dyn JobStore>, config: MaintenanceConfig, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        stale_grace_secs = config.stale_grace.as_secs(),
        "Job maintenance started",
    );

    let mut interval = tokio::time::interval(config.interval.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job maintenance stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(store.as_ref(), config.stale_grace).await {
                    Ok(report) if report == SweepReport::default() => {
                        tracing::debug!("Job maintenance: nothing to do");
                    }
                    Ok(report) => {
                        tracing::info!(
                            purged = report.purged,
                            recovered = report.recovered,
                            "Job maintenance sweep finished",
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Job maintenance sweep failed");
                    }
                }
            }
        }
    }
}
