//! Descriptor list ingress

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::middleware::RequireApiKey;
use crate::api::server::AppState;
use crate::error::{CastError, Result};
use crate::storage::write_atomic;

/// Replacement descriptor list
#[derive(Debug, Deserialize)]
pub struct UpdateNodesRequest {
    pub nodes: Vec<String>,
}

/// Replace the descriptor source with the submitted list
///
/// The file is swapped in whole; on failure the previous list stays intact.
pub async fn update_nodes(
    _auth: RequireApiKey,
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateNodesRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| CastError::InvalidRequest(e.body_text()))?;
    let contents = payload.nodes.join("\n");

    write_atomic(&state.nodes_file, contents.as_bytes())
        .await
        .map_err(|e| {
            CastError::Internal(format!(
                "failed to write {}: {}",
                state.nodes_file.display(),
                e
            ))
        })?;

    info!("Updated {} nodes via API", payload.nodes.len());

    Ok(Json(json!({
        "status": "success",
        "message": format!("Updated {} nodes.", payload.nodes.len()),
    })))
}
