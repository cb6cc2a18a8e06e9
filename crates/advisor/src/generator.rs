//! Text generation behind a prompt-in, string-out trait.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::ExternalServiceError;
use crate::prompts::ChatMessage;
use crate::resilience::{execute_with_retry_async, CircuitBreaker, CircuitState, RetryResult};

/// A hosted language model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete the conversation and return the trimmed reply.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ExternalServiceError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Stand-in used when no API key is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, ExternalServiceError> {
        Err(ExternalServiceError::NotConfigured)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Each call is bounded by [`GeneratorConfig::timeout`], covering every retry.
/// The circuit breaker belongs to this client instance.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: GeneratorConfig,
    api_key: String,
    breaker: CircuitBreaker,
}

impl ChatCompletionClient {
    pub fn new(config: GeneratorConfig) -> Result<Self, ExternalServiceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExternalServiceError::NotConfigured)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ExternalServiceError::Transport(e.to_string()))?;
        let breaker = CircuitBreaker::new(config.circuit_breaker);
        Ok(Self {
            http,
            config,
            api_key,
            breaker,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.current_state()
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> Result<String, ExternalServiceError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Http {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                ExternalServiceError::InvalidResponse("response contained no message content".into())
            })
    }

    async fn send_with_resilience(
        &self,
        messages: &[ChatMessage],
    ) -> Result<String, ExternalServiceError> {
        if !self.config.enable_resilience {
            return self.send_once(messages).await;
        }
        if !self.breaker.allow_request() {
            return Err(ExternalServiceError::CircuitOpen);
        }

        let outcome: RetryResult<String, ExternalServiceError> = execute_with_retry_async(
            &self.config.retry,
            ExternalServiceError::is_retryable,
            |attempt| async move {
                if attempt > 0 {
                    debug!(attempt, model = %self.config.model, "generator_retry");
                }
                self.send_once(messages).await
            },
        )
        .await;

        match &outcome.result {
            Ok(_) => self.breaker.record_success(),
            Err(err) => {
                self.breaker.record_failure();
                warn!(
                    attempts = outcome.attempts,
                    elapsed_micros = outcome.total_duration.as_micros(),
                    error = %err,
                    "generator_request_failed"
                );
            }
        }
        outcome.into_result()
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ExternalServiceError> {
        let start = Instant::now();
        let budget = self.config.timeout;
        let result = match tokio::time::timeout(budget, self.send_with_resilience(messages)).await {
            Ok(result) => result,
            Err(_) => {
                // The abandoned attempt counts against the breaker.
                if self.config.enable_resilience {
                    self.breaker.record_failure();
                }
                Err(timeout_error(budget))
            }
        };
        if result.is_ok() {
            debug!(
                model = %self.config.model,
                elapsed_micros = start.elapsed().as_micros(),
                "generator_success"
            );
        }
        result.map_err(|err| match err {
            ExternalServiceError::Timeout { after_ms: 0 } => timeout_error(start.elapsed()),
            other => other,
        })
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

pub(crate) fn timeout_error(after: Duration) -> ExternalServiceError {
    ExternalServiceError::Timeout {
        after_ms: after.as_millis() as u64,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, RetryConfig};
    use crate::prompts::cluster_insight_messages;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn config_for(endpoint: String) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_api_key("test-key")
            .with_endpoint(endpoint)
            .with_timeout(Duration::from_secs(5))
            .with_retry(
                RetryConfig::default()
                    .with_max_retries(2)
                    .with_base_delay(Duration::from_millis(1))
                    .with_jitter(false),
            )
    }

    #[tokio::test]
    async fn parses_and_trims_the_first_choice() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "meta-llama/Llama-3.3-70B-Instruct-Turbo");
                assert_eq!(body["messages"][0]["role"], "system");
                Json(json!({"choices": [{"message": {"role": "assistant", "content": "  Eat well.\n"}}]}))
            }),
        );
        let client = ChatCompletionClient::new(config_for(spawn_upstream(router).await)).unwrap();

        let reply = client.generate(&cluster_insight_messages(2)).await.unwrap();
        assert_eq!(reply, "Eat well.");
    }

    #[tokio::test]
    async fn retries_transient_statuses() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})))
                    } else {
                        (
                            StatusCode::OK,
                            Json(json!({"choices": [{"message": {"content": "ok"}}]})),
                        )
                    }
                }
            }),
        );
        let client = ChatCompletionClient::new(config_for(spawn_upstream(router).await)).unwrap();

        assert_eq!(client.generate(&cluster_insight_messages(0)).await.unwrap(), "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::UNAUTHORIZED }
            }),
        );
        let client = ChatCompletionClient::new(config_for(spawn_upstream(router).await)).unwrap();

        let err = client.generate(&cluster_insight_messages(0)).await.unwrap_err();
        assert!(matches!(err, ExternalServiceError::Http { status: 401, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_upstream_hits_the_budget() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                StatusCode::OK
            }),
        );
        let config = config_for(spawn_upstream(router).await).with_timeout(Duration::from_millis(100));
        let client = ChatCompletionClient::new(config).unwrap();

        let err = client.generate(&cluster_insight_messages(0)).await.unwrap_err();
        assert!(matches!(err, ExternalServiceError::Timeout { after_ms } if after_ms >= 100));
    }

    #[tokio::test]
    async fn open_circuit_fails_fast() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let config = config_for(spawn_upstream(router).await)
            .with_retry(RetryConfig::default().with_max_retries(0))
            .with_circuit_breaker(CircuitBreakerConfig::default().with_failure_threshold(2));
        let client = ChatCompletionClient::new(config).unwrap();

        for _ in 0..2 {
            assert!(client.generate(&cluster_insight_messages(0)).await.is_err());
        }
        assert_eq!(client.circuit_state(), CircuitState::Open);
        assert_eq!(
            client.generate(&cluster_insight_messages(0)).await.unwrap_err(),
            ExternalServiceError::CircuitOpen
        );
    }

    #[tokio::test]
    async fn empty_choices_are_invalid() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let client = ChatCompletionClient::new(config_for(spawn_upstream(router).await)).unwrap();
        assert!(matches!(
            client.generate(&cluster_insight_messages(0)).await,
            Err(ExternalServiceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn client_requires_a_key() {
        assert!(matches!(
            ChatCompletionClient::new(GeneratorConfig::default()),
            Err(ExternalServiceError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn disabled_generator_always_fails() {
        let err = DisabledGenerator.generate(&[]).await.unwrap_err();
        assert_eq!(err, ExternalServiceError::NotConfigured);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 5), "hi");
    }
}
