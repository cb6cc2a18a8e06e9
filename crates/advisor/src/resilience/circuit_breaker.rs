//! Circuit breaker for the text-generation upstream.
//!
//! After `failure_threshold` consecutive failures the circuit opens and calls
//! fail fast. Once `reset_timeout` has passed a single probe is let through
//! (half-open); its outcome closes or re-opens the circuit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait in the open state before probing again.
    #[serde(with = "crate::serde_millis")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_state_change: Instant,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    total_failures: AtomicU64,
    total_successes: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_state_change: Instant::now(),
            }),
            total_failures: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
        }
    }

    // Breaker state stays meaningful even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request may be sent now.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if inner.last_state_change.elapsed() >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.last_state_change = Instant::now();
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.last_state_change = Instant::now();
        }
    }

    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let trip = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            inner.state = CircuitState::Open;
            inner.last_state_change = Instant::now();
        }
    }

    pub fn current_state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn success_count(&self) -> u64 {
        self.total_successes.load(Ordering::Relaxed)
    }
}
