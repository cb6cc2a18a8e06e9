//! API route handlers
//!
//! - `health`: liveness, readiness and metrics
//! - `predict`: survey record to cluster, advisory and AI insights
//! - `chat`: free-form health questions passed to the text generator

pub mod chat;
pub mod health;
pub mod predict;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /)
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "HerHealth Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/predict_cluster",
            "/chat",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
