use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lumen_core::store::JobStore;
use lumen_db::PgJobStore;
use lumen_queue::{maintenance, Dispatcher};
use lumen_sdapi::SdApi;
use lumen_worker::config::WorkerConfig;
use lumen_worker::{handlers, shutdown};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_worker=debug,lumen_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        sd_api_host = %config.sd_api_host,
        concurrency = config.dispatcher.concurrency,
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = lumen_db::create_pool(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    lumen_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    lumen_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool));

    // --- Handlers ---
    let registry = handlers::registry(SdApi::new(config.sd_api_host.clone()))?;

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let maintenance_handle = tokio::spawn(maintenance::run(
        Arc::clone(&store),
        config.maintenance,
        cancel.clone(),
    ));

    let dispatcher = Dispatcher::new(store, Arc::new(registry), config.dispatcher.clone());
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    shutdown_signal().await;
    cancel.cancel();

    // The dispatcher enforces its own drain timeout; this is a backstop.
    let backstop = config.dispatcher.shutdown_timeout + Duration::from_secs(5);
    shutdown::join_within("dispatcher", dispatcher_handle, backstop).await;
    shutdown::join_within("maintenance", maintenance_handle, Duration::from_secs(5)).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
