use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use lumen_core::store::JobStore;
use lumen_db::{DatabaseConfig, PgJobStore};
use lumen_queue::config::SubmitterConfig;
use lumen_queue::{ResultWaiter, Submitter};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumen_api::config::ServerConfig;
use lumen_api::router::build_app_router;
use lumen_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_api=debug,lumen_queue=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let database = DatabaseConfig::from_env().context("Invalid database configuration")?;
    let submit = SubmitterConfig::from_env().context("Invalid job configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        queue = %submit.queue,
        max_pending = ?submit.admission.max_pending,
        "Loaded server configuration",
    );

    // --- Database ---
    let pool = lumen_db::create_pool(&database.url, database.max_connections)
        .await
        .context("Failed to connect to database")?;
    lumen_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    lumen_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- App state ---
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool));
    let shutdown = CancellationToken::new();
    let state = AppState {
        submitter: Submitter::new(Arc::clone(&store), submit),
        waiter: ResultWaiter::with_poll_interval(Arc::clone(&store), config.wait_poll_interval),
        store,
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

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
