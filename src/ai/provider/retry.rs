//! Exponential backoff retry policy for provider adapters.
//!
//! Delay before attempt `n + 1` is `min(base × 2^(n−1), max)` plus uniform
//! random jitter in `[0, jitter × delay)`. Jitter keeps concurrent batch items
//! from retrying in lockstep; a jitter of 0 gives the plain schedule.
//!
//! Every failure is classified into a [`ProviderError`]; once attempts are
//! exhausted (or the failure is permanent) the typed error is returned with
//! `retryable` preserved.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::RetryConfig;
use crate::types::{ApiDocError, ErrorCategory, ErrorClassifier, ProviderError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Backoff before the attempt following `attempt` (1-based), without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay_ms = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Backoff with random jitter applied
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        delay + random_jitter(delay, self.config.jitter)
    }

    fn should_retry(&self, err: &ProviderError) -> bool {
        if err.error_type == ErrorCategory::Cancelled {
            return false;
        }
        err.retryable || self.config.retry_non_retryable
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<F, Fut, T>(&self, provider: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(provider, attempt, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(ApiDocError::Cancelled) => return Err(ApiDocError::Cancelled),
                Err(e) => ErrorClassifier::classify_error(&e, provider).attempts(attempt),
            };

            if attempt >= max_attempts || !self.should_retry(&err) {
                warn!(
                    provider,
                    attempt,
                    retryable = err.retryable,
                    "Provider call failed, giving up: {}",
                    err
                );
                return Err(ApiDocError::Provider(err));
            }

            let delay = self.jittered_delay(attempt);
            warn!(
                provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Provider call failed, retrying: {}",
                err
            );
            sleep(delay).await;
        }
    }
}

/// Uniform jitter in `[0, fraction × base)`
fn random_jitter(base_delay: Duration, fraction: f64) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as f64 * fraction.clamp(0.0, 1.0)) as u64;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}
