//! Resilience primitives shared by the Router and every agent call (§4.5).
//!
//! `retry` implements the exponential-backoff retry wrapper (C5).
//! `circuit_breaker` tracks provider health so the Router does not keep
//! hammering a provider that just failed a health check (§4.4, §5).

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerOpenError, CircuitBreakerStats, CircuitState};
pub use retry::{retry, retry_with_policy, DefaultRetryPolicy, RetryConfig, RetryError, RetryExecutor, RetryPolicy, RetryStats};
