use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{CircuitBreakerConfig, RetryConfig};

pub const DEFAULT_ENDPOINT: &str = "https://api.together.xyz/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

/// Settings for the chat-completions client.
///
/// Durations are written as milliseconds. The API key is never serialized.
///
/// ```
/// use advisor::GeneratorConfig;
/// use std::time::Duration;
///
/// let cfg = GeneratorConfig::default().with_api_key("secret");
/// assert_eq!(cfg.timeout, Duration::from_secs(20));
/// assert!(cfg.has_api_key());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Budget for one logical call, retries included.
    #[serde(with = "crate::serde_millis")]
    pub timeout: Duration,
    #[serde(with = "crate::serde_millis")]
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry and circuit breaking; off means one bare attempt.
    pub enable_resilience: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            temperature: 0.3,
            max_tokens: None,
            api_key: None,
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            enable_resilience: true,
        }
    }
}

impl GeneratorConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("generator endpoint must not be empty".into());
        }
        if self.model.trim().is_empty() {
            return Err("generator model must not be empty".into());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "generator temperature must be in [0, 2], got {}",
                self.temperature
            ));
        }
        if self.timeout.is_zero() {
            return Err("generator timeout must be greater than zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hosted_model() {
        let cfg = GeneratorConfig::default();
        assert_eq!(cfg.model, "meta-llama/Llama-3.3-70B-Instruct-Turbo");
        assert_eq!(cfg.temperature, 0.3);
        assert!(cfg.enable_resilience);
        assert!(!cfg.has_api_key());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn durations_are_millis_and_key_is_hidden() {
        let cfg = GeneratorConfig::default()
            .with_api_key("sk-123")
            .with_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["timeout"], 1500);
        assert_eq!(json["retry"]["base_delay"], 200);
        assert!(json.get("api_key").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: GeneratorConfig =
            serde_json::from_str(r#"{"timeout": 500, "retry": {"max_retries": 0}}"#).unwrap();
        assert_eq!(cfg.timeout, Duration::from_millis(500));
        assert_eq!(cfg.retry.max_retries, 0);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(200));
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn blank_key_does_not_count() {
        assert!(!GeneratorConfig::default().with_api_key("  ").has_api_key());
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = GeneratorConfig::default().with_timeout(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }
}
