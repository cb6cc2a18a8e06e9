//! Retry and circuit-breaker wrappers for the text-generation client.
//!
//! Both guard a single upstream; the breaker is owned by the client that
//! uses it, so two clients never share failure state.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{execute_with_retry_async, RetryConfig, RetryResult};
