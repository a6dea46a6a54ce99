//! Request Cache Gateway
//!
//! Caching read-through gateway in front of the storefront data API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_cache::api::create_router;
use request_cache::{spawn_snapshot_task, AppState, Config};

/// Main entry point for the caching gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the request cache and restore the last snapshot
/// 4. Start the background snapshot task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, stop the snapshot task and export a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting request cache gateway");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, default_max_age={}s, stale_while_revalidate={}, fetch_timeout={}s, port={}",
        config.upstream_url,
        config.default_max_age,
        config.stale_while_revalidate,
        config.fetch_timeout,
        config.server_port
    );

    // Create application state and warm the cache from the last snapshot
    let state = AppState::from_config(&config);
    let snapshot_handle = match &state.snapshots {
        Some(store) => {
            state
                .cache
                .import_snapshot_in_background(store.clone(), &state.snapshot_key)
                .await;
            if config.snapshot_interval > 0 {
                Some(spawn_snapshot_task(
                    state.cache.clone(),
                    store.clone(),
                    state.snapshot_key.clone(),
                    config.snapshot_interval,
                ))
            } else {
                None
            }
        }
        None => {
            warn!("No snapshot directory available, cache will start cold on every restart");
            None
        }
    };
    info!("Request cache initialized with {} entries", state.cache.size());

    // Create router with all endpoints
    let app = create_router(state.clone());

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Gateway listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = snapshot_handle {
        handle.abort();
    }
    if let Some(store) = &state.snapshots {
        state
            .cache
            .export_snapshot_in_background(store.clone(), &state.snapshot_key)
            .await;
    }

    info!("Gateway shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
}
