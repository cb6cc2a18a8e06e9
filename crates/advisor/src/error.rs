use thiserror::Error;

/// Failures of the hosted text-generation service.
///
/// On the prediction path these are recovered with a fallback string; on the
/// chat path they become an error response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExternalServiceError {
    /// No API key was configured, so no client exists.
    #[error("text generation is not configured")]
    NotConfigured,

    /// The call (all retries included) exceeded its time budget.
    #[error("text generation timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The service answered with a non-success status.
    #[error("text generation service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or protocol failure before a response arrived.
    #[error("text generation request failed: {0}")]
    Transport(String),

    /// The response body was not a usable chat completion.
    #[error("invalid text generation response: {0}")]
    InvalidResponse(String),

    /// The client's circuit breaker is open.
    #[error("text generation circuit is open; service temporarily unavailable")]
    CircuitOpen,
}

impl ExternalServiceError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExternalServiceError::Timeout { .. } | ExternalServiceError::Transport(_) => true,
            ExternalServiceError::Http { status, .. } => {
                matches!(*status, 408 | 429) || (500..=599).contains(status)
            }
            ExternalServiceError::NotConfigured
            | ExternalServiceError::InvalidResponse(_)
            | ExternalServiceError::CircuitOpen => false,
        }
    }
}

impl From<reqwest::Error> for ExternalServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExternalServiceError::Timeout { after_ms: 0 }
        } else if err.is_decode() {
            ExternalServiceError::InvalidResponse(err.to_string())
        } else {
            ExternalServiceError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            let err = ExternalServiceError::Http {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "{status} should be retried");
        }
        for status in [400, 401, 403, 404, 422] {
            let err = ExternalServiceError::Http {
                status,
                body: String::new(),
            };
            assert!(!err.is_retryable(), "{status} should not be retried");
        }
    }

    #[test]
    fn configuration_errors_are_not_retried() {
        assert!(!ExternalServiceError::NotConfigured.is_retryable());
        assert!(!ExternalServiceError::CircuitOpen.is_retryable());
        assert!(ExternalServiceError::Transport("connection reset".into()).is_retryable());
    }
}
