use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use advisor::insight_or_fallback;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use herhealth::SurveyRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a successful `POST /predict_cluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(rename = "Predicted_Cluster")]
    pub predicted_cluster: i64,
    #[serde(rename = "Health_Insight")]
    pub health_insight: String,
    #[serde(rename = "AI_Insights")]
    pub ai_insights: String,
}

/// Classify one survey record and attach the advisory and generated insights.
///
/// A generator failure never fails the request; `AI_Insights` carries the
/// fallback text instead.
pub async fn predict_cluster(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<SurveyRecord>, JsonRejection>,
) -> ServerResult<Json<PredictionResponse>> {
    let Json(survey) = payload.map_err(|rejection| {
        metrics::counter!("herhealth_validation_rejections_total").increment(1);
        ServerError::from(rejection)
    })?;

    let prediction = state.serving.predict_survey(&survey).map_err(|err| {
        if err.is_client_error() {
            metrics::counter!("herhealth_validation_rejections_total").increment(1);
        }
        tracing::warn!(error = %err, "prediction_rejected");
        ServerError::from(err)
    })?;

    let cluster = i64::from(prediction.cluster);
    metrics::counter!("herhealth_predictions_total", "cluster" => cluster.to_string())
        .increment(1);

    let insight =
        insight_or_fallback(state.generator.as_ref(), cluster, state.generation_budget()).await;
    if insight.is_fallback() {
        metrics::counter!("herhealth_generator_fallbacks_total").increment(1);
    }

    tracing::info!(cluster, "prediction_served");
    Ok(Json(PredictionResponse {
        predicted_cluster: cluster,
        health_insight: prediction.advisory.to_string(),
        ai_insights: insight.into_text(),
    }))
}
