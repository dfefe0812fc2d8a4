//! kensaku server entry point

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kensaku_server::{build_router, config::ServerConfig, AppState};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() {
    // Load configuration
    let config_path = std::env::var("KENSAKU_CONFIG").ok().or_else(|| {
        std::path::Path::new(DEFAULT_CONFIG_PATH)
            .exists()
            .then(|| DEFAULT_CONFIG_PATH.to_string())
    });
    let (config, config_error) = match ServerConfig::load(config_path.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (ServerConfig::default(), Some(e.to_string())),
    };

    // Initialize logging (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    if let Some(e) = config_error {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    tracing::info!("Starting kensaku server...");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Invalid search configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Search parameters: {} definitions, handling={:?}",
        state.registry.len(),
        state.config.search.handling
    );

    // Build router
    let app = build_router(state);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {}", e);
        });

    tracing::info!("Server shut down gracefully");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
