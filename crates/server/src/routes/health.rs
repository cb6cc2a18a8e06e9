use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "herhealth-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// State only exists once every artifact loaded, so reaching this handler
/// means the models are ready. The body summarizes what was loaded.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let serving = &state.serving;

    Ok(Json(json!({
        "status": "ready",
        "service": "herhealth-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "models": {
            "columns": serving.columns(),
            "embedding_width": serving.embedding_width(),
            "clusters": serving.n_clusters(),
        },
        "generator": state.generator.name(),
    })))
}

/// Prometheus metrics endpoint
///
/// Falls back to uptime JSON when no recorder is installed.
pub async fn metrics(State(state): State<Arc<ServerState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => Json(json!({
            "uptime_seconds": state.uptime_seconds(),
        }))
        .into_response(),
    }
}
