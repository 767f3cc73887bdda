use anyhow::{Context, Result};
use axum::{Router, routing::get};
use cloud_topology_api::config::{self, AppConfig};
use cloud_topology_api::middleware::{create_cors_layer, init_tracing};
use cloud_topology_api::provider::{HttpProviderClient, ProviderClient, SimulatedProvider};
use cloud_topology_api::routes::{self, AppState, create_api_router};
use cloud_topology_api::services::JwtService;
use cloud_topology_api::storage::{InMemoryStorageBackend, PostgresStorageBackend, StorageBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// Panic hook to catch and log panics
fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();
        tracing::error!(%location, "PANIC: {}", message);
    }));
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_tracing(config::log_format_from_env());
    setup_panic_hook();
    info!("Application starting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let layout = config.layout_config().context("Invalid layout configuration")?;

    let storage: Arc<dyn StorageBackend> = match &config.database_url {
        Some(url) => {
            info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorageBackend::connect(url)
                    .await
                    .context("Failed to initialize PostgreSQL storage")?,
            )
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage. Data is lost on restart.");
            Arc::new(InMemoryStorageBackend::new())
        }
    };

    let provider: Arc<dyn ProviderClient> = match &config.provider_url {
        Some(url) => {
            info!(provider_url = %url, "Using HTTP provider gateway");
            Arc::new(
                HttpProviderClient::new(
                    url,
                    config.provider_token.clone(),
                    config.provider_timeout,
                )
                .context("Failed to build provider client")?,
            )
        }
        None => {
            warn!("PROVIDER_URL not set, deployments run against the simulated provider");
            Arc::new(SimulatedProvider::new())
        }
    };

    let app_state = AppState::new(
        storage,
        provider,
        config.deployment_settings(layout),
        JwtService::new(&config.jwt_secret),
    );

    // Nothing can be running yet, so any in_progress row is left over from a previous process
    app_state
        .orchestrator
        .recover_interrupted()
        .await
        .context("Failed to recover interrupted deployments")?;

    let app = Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api/v1", create_api_router(app_state.clone()))
        .with_state(app_state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);
    info!("API health check available at http://{}/api/v1/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Waiting for queued deployments to finish...");
    app_state.orchestrator.wait_idle().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down gracefully"),
                    _ = sigterm.recv() => info!("SIGTERM received, shutting down gracefully"),
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
