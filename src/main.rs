//! Nodecast - Entry Point
//!
//! Starts the refresh service and API server with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodecast::api::ApiServer;
use nodecast::config::{Config, LogConfig};
use nodecast::error::{CastError, Result};
use nodecast::node::{AggregatorOracle, FileStateStore, RotationSelector};
use nodecast::services::{RefreshHandle, RefreshService, RefreshServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log);

    info!("Starting Nodecast");
    info!("Configuration loaded");

    // Make sure the rotation cursor exists before the first cycle
    let state = FileStateStore::new(config.storage.state_file.clone());
    state.initialize().await?;

    let oracle = AggregatorOracle::new(&config.oracle)?;
    let selector = Arc::new(RotationSelector::new(
        Arc::new(oracle),
        Arc::new(state),
        config.refresh.probe_delay(),
    ));

    let (refresh_handle, refresh_shutdown) = RefreshHandle::new();
    let refresh_service = RefreshService::new(
        selector,
        RefreshServiceConfig {
            interval: config.refresh.interval(),
            nodes_file: config.storage.nodes_file.clone(),
        },
    );

    // Create API server; failing to bind is fatal before anything runs
    let api_server = ApiServer::new(
        config.api.clone(),
        config.storage.nodes_file.clone(),
        refresh_service.subscribe(),
    );
    let listener = api_server.bind().await.map_err(|e| {
        error!("Failed to bind API server on {}: {}", config.api_addr(), e);
        e
    })?;
    info!("API server listening on {}", listener.local_addr()?);

    // Start refresh service
    let refresh_task = tokio::spawn(async move {
        refresh_service.run(refresh_shutdown).await;
    });

    let (shutdown_tx, api_shutdown) = watch::channel(false);
    let mut api_task =
        tokio::spawn(async move { api_server.serve(listener, api_shutdown).await });

    // Wait for shutdown signal, or for the API server to stop on its own
    let early_exit = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            None
        }
        result = &mut api_task => Some(result),
    };

    let _ = shutdown_tx.send(true);
    refresh_handle.shutdown();

    let api_result = match early_exit {
        Some(result) => result,
        None => api_task.await,
    };
    let _ = refresh_task.await;

    match api_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("API server error: {}", e);
            return Err(e);
        }
        Err(e) => {
            error!("API server task failed: {}", e);
            return Err(CastError::Internal(e.to_string()));
        }
    }

    info!("Nodecast stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("nodecast={},tower_http=info", log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
