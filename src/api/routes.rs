//! API route definitions

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/status", get(handlers::health::status))
        // Descriptor ingress (API key checked by the handler's extractor)
        .route("/api/update_nodes", post(handlers::nodes::update_nodes))
        .with_state(state)
}
