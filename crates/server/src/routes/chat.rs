use crate::error::ServerError;
use crate::state::ServerState;
use advisor::chat_reply;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Absent means empty.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Pass a health question to the text generator.
///
/// Generator failures become `502 {"error": "..."}`.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, Response> {
    let Json(request) = payload.map_err(|rejection| ServerError::from(rejection).into_response())?;

    match chat_reply(
        state.generator.as_ref(),
        &request.message,
        state.generation_budget(),
    )
    .await
    {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(err) => {
            metrics::counter!("herhealth_chat_failures_total").increment(1);
            tracing::warn!(
                generator = state.generator.name(),
                error = %err,
                "chat_failed"
            );
            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response())
        }
    }
}
