//! Chatsync - Write-back chat state cache with persistence reconciliation

use std::net::SocketAddr;

use anyhow::Context as _;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatsync::api::create_router;
use chatsync::tasks::{drain_queue, spawn_reconciler_task, spawn_runner_task};
use chatsync::{AppState, Config, SyncContext};

/// Main entry point for the chat state sync engine.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Compose store handles into the engine context
/// 4. Start the background persistence reconciler
/// 5. Start the persistence runner workers
/// 6. Create the Axum router with all endpoints
/// 7. Start the HTTP server on the configured port
/// 8. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatsync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chat state sync engine");

    // Load configuration from environment variables
    let config = Config::from_env();
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!(msg))
        .context("invalid configuration")?;
    info!(
        "Configuration loaded: cache_ttl={}s, scan_interval={}s, warning_threshold={}s, port={}",
        config.cache_ttl, config.scan_interval, config.ttl_warning_threshold, config.server_port
    );

    // Compose the engine context over in-memory backends
    let ctx = SyncContext::in_memory(config.clone());
    info!("Store handles initialized");

    // Start the background reconciler
    let reconciler_handle = spawn_reconciler_task(ctx.clone(), config.scan_interval());
    info!("Persistence reconciler started");

    // Start the persistence runner workers
    let runner_handles: Vec<JoinHandle<()>> = (0..config.runner_workers)
        .map(|_| spawn_runner_task(ctx.clone()))
        .collect();
    info!("Started {} persistence runners", runner_handles.len());

    // Create router with all endpoints
    let app = create_router(AppState::new(ctx.clone()));

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(reconciler_handle, runner_handles))
        .await
        .context("server error")?;

    // Work already dispatched must not be lost to the shutdown.
    let drained = drain_queue(&ctx).await;
    if drained > 0 {
        info!("Drained {} pending persistence jobs on shutdown", drained);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful
/// shutdown. Persistence decisions already dispatched stay in the queue and
/// are drained before the process exits.
async fn shutdown_signal(reconciler_handle: JoinHandle<()>, runner_handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the background tasks
    reconciler_handle.abort();
    for handle in runner_handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
