//! Bounded retry with exponential backoff for generation calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::GenerationError;

/// Default number of attempts per generation call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Retry policy applied to every generation call.
///
/// Only [transient](GenerationError::is_transient) failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Policy with the default delays. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Override the backoff delays.
    #[must_use]
    pub const fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Maximum number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before retry number `retry` (1-based), without jitter.
    ///
    /// Doubles from the base delay and is capped at the max delay.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// A rate limit's `Retry-After` replaces the computed backoff when it is
    /// longer, still capped at the max delay.
    ///
    /// # Errors
    ///
    /// Returns the last error from `call`.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let mut delay = self.delay_for(attempt);
                    if let GenerationError::RateLimited(seconds) = &e {
                        delay = delay.max(Duration::from_secs(*seconds)).min(self.max_delay);
                    }
                    let delay = jitter(delay);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying generation call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!(
                            operation,
                            attempt,
                            error = %e,
                            "Generation call failed, attempts exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Scale `delay` by a random factor in `[0.5, 1.0]`.
fn jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor: f64 = rand::rng().random_range(0.5..=1.0);
    delay.mul_f64(factor)
}
