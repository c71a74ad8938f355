//! Retry with exponential backoff, wrapped in a circuit breaker.
//!
//! Retry is the inner layer: one logical call may make several physical
//! attempts, and the breaker only sees the aggregate outcome. Every attempt
//! runs under a fixed timeout, and an expired timeout counts as a transient
//! failure.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::circuit_breaker::{CallOutcome, CircuitBreaker, CircuitBreakerConfig};
use crate::error::{FxError, FxResult};

/// Backoff and retry limits for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff unit; retry n waits `2^n` of these.
    pub backoff_base: Duration,
    /// Upper bound (exclusive) of the random jitter added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `retry` (1-indexed), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(retry))
    }

    /// Backoff before retry `retry` (1-indexed), with jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.backoff(retry) + jitter
    }
}

/// Configuration for [`Resilience`].
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
    /// Timeout applied to each physical attempt.
    pub attempt_timeout: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Guards outbound calls with retry, timeouts and a circuit breaker.
pub struct Resilience {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    attempt_timeout: Duration,
}

impl Resilience {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            retry: config.retry,
            breaker: CircuitBreaker::with_config(config.breaker),
            attempt_timeout: config.attempt_timeout,
        }
    }

    /// Breaker state, for inspection.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `attempt` against `destination`.
    ///
    /// `attempt` is called once per physical attempt and must build a fresh
    /// future each time.
    pub async fn execute<R, F, Fut>(&self, destination: &str, mut attempt: F) -> FxResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FxResult<R>>,
    {
        let permit = self.breaker.try_acquire(destination)?;
        let result = self.run_with_retry(destination, &mut attempt).await;
        permit.complete(CallOutcome::of(&result));
        result
    }

    async fn run_with_retry<R, F, Fut>(&self, destination: &str, attempt: &mut F) -> FxResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FxResult<R>>,
    {
        let mut retry = 0;

        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(FxError::transient(
                    destination,
                    format!("timed out after {:?}", self.attempt_timeout),
                )),
            };

            match result {
                Err(e) if e.is_transient() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        destination,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for Resilience {
    fn default() -> Self {
        Self::new(ResilienceConfig::default())
    }
}
