//! API server using Axum
//!
//! Serves the descriptor-update ingress and read-only status endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ApiServerConfig;
use crate::error::{CastError, Result};
use crate::models::CycleSummary;

use super::middleware::ApiKey;
use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub api_key: ApiKey,
    pub nodes_file: Arc<PathBuf>,
    pub started_at: Instant,
    pub latest: watch::Receiver<Option<CycleSummary>>,
}

impl AppState {
    pub fn new(
        api_key: ApiKey,
        nodes_file: PathBuf,
        latest: watch::Receiver<Option<CycleSummary>>,
    ) -> Self {
        Self {
            api_key,
            nodes_file: Arc::new(nodes_file),
            started_at: Instant::now(),
            latest,
        }
    }
}

impl FromRef<AppState> for ApiKey {
    fn from_ref(state: &AppState) -> ApiKey {
        state.api_key.clone()
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        nodes_file: PathBuf,
        latest: watch::Receiver<Option<CycleSummary>>,
    ) -> Self {
        let state = AppState::new(ApiKey::new(config.api_key.clone()), nodes_file, latest);
        Self { config, state }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured listen address
    ///
    /// # Errors
    ///
    /// Returns `CastError::InvalidConfig` for an unparsable address and
    /// `CastError::Io` if the address cannot be bound
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| CastError::InvalidConfig(format!("Invalid API server address: {}", e)))?;

        Ok(TcpListener::bind(addr).await?)
    }

    /// Serve requests on an already bound listener until shutdown
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        info!("API server shut down");
        Ok(())
    }
}
