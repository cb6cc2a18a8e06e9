//! Cluster advisories and language-model insights.
//!
//! Two things live here. [`InsightResolver`] is the fixed table mapping a
//! cluster id to a canned advisory. The [`TextGenerator`] trait abstracts the
//! hosted model that writes free-text insights; [`ChatCompletionClient`] is
//! the production implementation (OpenAI-compatible chat completions with
//! retry, a circuit breaker and an overall timeout) and
//! [`DisabledGenerator`] stands in when no API key is configured.
//!
//! Generation failures on the prediction path never surface to the caller:
//! [`insight_or_fallback`] logs them and returns [`Insight::Fallback`], which
//! renders as [`FALLBACK_INSIGHT`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

mod config;
mod error;
mod generator;
mod insights;
mod prompts;
pub mod resilience;
mod serde_millis;

pub use crate::config::{GeneratorConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use crate::error::ExternalServiceError;
pub use crate::generator::{ChatCompletionClient, DisabledGenerator, TextGenerator};
pub use crate::insights::{InsightResolver, UNKNOWN_CLUSTER};
pub use crate::prompts::{
    chat_messages, cluster_insight_messages, ChatMessage, CHAT_SYSTEM_ROLE, FALLBACK_INSIGHT,
    INSIGHT_SYSTEM_ROLE,
};

/// Build the configured generator, or a [`DisabledGenerator`] without an API key.
pub fn build_generator(config: &GeneratorConfig) -> Arc<dyn TextGenerator> {
    if !config.has_api_key() {
        warn!("generator_disabled_no_api_key");
        return Arc::new(DisabledGenerator);
    }
    match ChatCompletionClient::new(config.clone()) {
        Ok(client) => {
            info!(model = %config.model, endpoint = %config.endpoint, "generator_ready");
            Arc::new(client)
        }
        Err(err) => {
            warn!(error = %err, "generator_init_failed");
            Arc::new(DisabledGenerator)
        }
    }
}

/// Run one generation bounded by `budget`.
pub async fn generate_within(
    generator: &dyn TextGenerator,
    messages: &[ChatMessage],
    budget: Duration,
) -> Result<String, ExternalServiceError> {
    match tokio::time::timeout(budget, generator.generate(messages)).await {
        Ok(result) => result,
        Err(_) => Err(ExternalServiceError::Timeout {
            after_ms: budget.as_millis() as u64,
        }),
    }
}

/// Outcome of an insight request on the prediction path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insight {
    Generated(String),
    /// Generation failed or ran out of time.
    Fallback,
}

impl Insight {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Insight::Fallback)
    }

    /// Text to show the caller.
    pub fn into_text(self) -> String {
        match self {
            Insight::Generated(text) => text,
            Insight::Fallback => FALLBACK_INSIGHT.to_string(),
        }
    }
}

/// Insights for `cluster`, or [`Insight::Fallback`] if generation fails.
pub async fn insight_or_fallback(
    generator: &dyn TextGenerator,
    cluster: i64,
    budget: Duration,
) -> Insight {
    match generate_within(generator, &cluster_insight_messages(cluster), budget).await {
        Ok(text) => Insight::Generated(text),
        Err(err) => {
            warn!(
                cluster,
                generator = generator.name(),
                error = %err,
                "generator_fallback"
            );
            Insight::Fallback
        }
    }
}

/// Free-form chat answer. Errors are returned to the caller.
pub async fn chat_reply(
    generator: &dyn TextGenerator,
    message: &str,
    budget: Duration,
) -> Result<String, ExternalServiceError> {
    generate_within(generator, &chat_messages(message), budget).await
}
