//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "nodecast"
        })),
    )
}

/// Uptime and the most recently published cycle summary
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest.borrow().clone();

    Json(json!({
        "status": "running",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "latest": latest,
    }))
}
