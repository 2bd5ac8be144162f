//! Retry and exponential backoff for provider calls
//!
//! One policy serves every boundary call. The caller supplies a function
//! that sorts errors into [`RetryClass`]es; the policy decides how long to
//! wait and when to give up.

use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How a failed call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Rate limited or overloaded; wait `retry_after` when the server gave one
    Throttled { retry_after: Option<Duration> },

    /// Timeout, connection failure or malformed payload
    Transient,

    /// Never retried; the error is returned to the caller
    Fatal,
}

/// Outcome of a call that did not fail fatally
#[derive(Debug, Clone, PartialEq)]
pub enum Attempted<T> {
    Done(T),

    /// Every attempt hit a retryable error
    Exhausted { attempts: u32 },
}

/// Bounded exponential backoff
///
/// | Retry | Wait (no server hint) |
/// |-------|-----------------------|
/// | 1 | `base` |
/// | 2 | `base * 2` |
/// | n | `min(base * 2^(n-1), max_delay)` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay after the `retry`-th failure (0-based), capped at `max_delay`
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether a server-suggested wait is longer than our own backoff would ever be
    pub fn exceeds_cap(&self, wait: Duration) -> bool {
        wait > self.max_delay
    }

    /// Runs `call` until it succeeds, fails fatally, or runs out of attempts
    ///
    /// A server-suggested wait is honored as given, even above `max_delay`;
    /// such waits are logged as warnings.
    pub async fn run<T, E, C, F, Fut>(
        &self,
        operation: &str,
        classify: C,
        mut call: F,
    ) -> Result<Attempted<T>, E>
    where
        E: Display,
        C: Fn(&E) -> RetryClass,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match call().await {
                Ok(value) => return Ok(Attempted::Done(value)),
                Err(err) => err,
            };

            let delay = match classify(&err) {
                RetryClass::Fatal => return Err(err),
                RetryClass::Throttled {
                    retry_after: Some(wait),
                } => {
                    if self.exceeds_cap(wait) {
                        tracing::warn!(
                            "{}: server asked to wait {:?}, above the {:?} backoff cap",
                            operation,
                            wait,
                            self.max_delay
                        );
                    }
                    wait
                }
                RetryClass::Throttled { retry_after: None } | RetryClass::Transient => {
                    self.backoff_delay(attempt - 1)
                }
            };

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "{} gave up after {} attempts: {}",
                    operation,
                    attempt,
                    err
                );
                return Ok(Attempted::Exhausted { attempts: attempt });
            }

            tracing::warn!(
                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                operation,
                attempt,
                self.max_attempts,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
