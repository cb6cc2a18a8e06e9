use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use herhealth::ServingError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed JSON that does not match the survey contract.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Serving(#[from] ServingError),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Serving(err) => StatusCode::from_u16(err.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ServerError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ServerError::Serving(err) if err.is_client_error() => "INVALID_RECORD",
            ServerError::Serving(_) => "MODEL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::Serving(ServingError::Normalize(err)) => {
                err.column().map(|column| json!({ "column": column }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ServerError::InvalidPayload(err.body_text()),
            other => ServerError::BadRequest(other.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herhealth::NormalizeError;

    #[test]
    fn serving_errors_map_to_status() {
        let err = ServerError::from(ServingError::from(NormalizeError::MissingColumn(
            "BMI".into(),
        )));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "INVALID_RECORD");
        assert_eq!(err.details(), Some(json!({ "column": "BMI" })));
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(ServerError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::NotFound.error_code(), "NOT_FOUND");
    }
}
