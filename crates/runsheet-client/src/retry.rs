//! Bounded retry with exponential backoff for remote calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::RetryConfig;

/// How often and how patiently a failing call is retried.
///
/// The first attempt runs immediately. After the n-th retryable failure the
/// caller's task sleeps for `delay * backoff^(n-1)` before trying again, until
/// `max_attempts` calls have been made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
            backoff: config.backoff,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `op` until it succeeds, fails with an error `should_retry`
    /// rejects, or the attempts are used up. The last error is returned as is.
    pub async fn run<T, E, F, Fut, P>(&self, operation: &str, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        let mut delay = self.delay;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && should_retry(&e) => {
                    tracing::warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:.2?}...",
                        operation,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    delay = Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff)
                        .unwrap_or(Duration::MAX);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
