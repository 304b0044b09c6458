//! Tiered Cache - operations server
//!
//! Runs a cache manager behind a small HTTP surface with its background
//! maintenance loops.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::{create_router, AppState};
use tiered_cache::cache::{CacheManager, MemoryRemote, RedisRemote, RemoteStore};
use tiered_cache::config::{Config, RemoteBackend};
use tiered_cache::tasks::{spawn_background_tasks, BackgroundTasks};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the remote tier and build the cache manager
/// 4. Start the cleanup, prefetch and stats snapshot loops
/// 5. Serve the HTTP surface until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: remote={:?} {}, hot={}, warm={} ({}s), port={}",
        config.remote_backend,
        config.remote_url(),
        config.hot_cache_size,
        config.warm_cache_size,
        config.warm_cache_ttl_seconds,
        config.server_port
    );

    let remote: Arc<dyn RemoteStore> = match config.remote_backend {
        RemoteBackend::Redis => Arc::new(
            RedisRemote::from_config(&config).context("failed to configure redis client")?,
        ),
        RemoteBackend::Memory => Arc::new(MemoryRemote::new()),
    };

    let port = config.server_port;
    let manager =
        Arc::new(CacheManager::new(config, remote).context("failed to build cache manager")?);

    if !manager.health_check().await {
        tracing::warn!("Remote tier not reachable at startup, continuing degraded");
    }

    let tasks = spawn_background_tasks(manager.clone()).await;

    let app = create_router(AppState::new(manager));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops the background loops.
async fn shutdown_signal(mut tasks: BackgroundTasks) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tasks.shutdown();
}
