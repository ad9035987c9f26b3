//! Bounded exponential-backoff retries.
//!
//! Idempotent reads against the backend (frame pages, images, tracking
//! requests) retry on transient failure with exponentially growing
//! delays, up to a small attempt ceiling; after exhaustion the operation
//! is abandoned and surfaced, never retried silently forever.  "Not
//! ready yet" responses are not failures and must be handled by the
//! caller outside this helper, so they never consume retry budget.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Total attempts (including the first) before giving up.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Ceiling used by endpoints that only warrant a quick second try.
    pub fn two_attempts() -> Self {
        Self {
            max_attempts: 2,
            ..Self::default()
        }
    }
}

/// Why a retried operation ultimately did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: Display> {
    /// Every attempt failed; holds the last error.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// The cancellation token was triggered while waiting to retry.
    #[error("Cancelled while retrying")]
    Cancelled,
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Run a fallible async operation with bounded exponential backoff.
///
/// Returns the first success, or [`RetryError::Exhausted`] with the last
/// error once the attempt ceiling is hit, or [`RetryError::Cancelled`]
/// if `cancel` fires during a backoff wait.
pub async fn retry_with_backoff<T, E, F, Fut>(
    op_name: &'static str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt == config.max_attempts => {
                tracing::error!(op = op_name, attempt, error = %e, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                tracing::warn!(
                    op = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, backing off",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        delay = next_delay(delay, config);
    }

    // max_attempts >= 1 always returns inside the loop.
    Err(RetryError::Cancelled)
}
