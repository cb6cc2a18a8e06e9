//! Retry logic with exponential backoff for transient failures.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one.
    pub max_retries: u32,
    /// Base delay between retries (doubled per attempt).
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt + 1`.
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
        let delay = exponential.min(self.max_delay.as_millis() as u64);

        if self.jitter {
            let jitter = fastrand::u64(0..=delay / 2);
            Duration::from_millis(delay + jitter)
        } else {
            Duration::from_millis(delay)
        }
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Number of attempts made (1 = no retries needed).
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, fails with an error `retryable`
/// rejects, or the retry budget is spent.
pub async fn execute_with_retry_async<T, E, F, Fut, R>(
    config: &RetryConfig,
    retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
            Err(error) => {
                if attempt >= config.max_retries || !retryable(&error) {
                    return RetryResult {
                        result: Err(error),
                        attempts: attempt + 1,
                        total_duration: start.elapsed(),
                    };
                }
                tokio::time::sleep(config.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}
