//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::ToolmeshError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(retry - 1)`: base, 2*base, 4*base, ...
    Exponential { base: Duration },
    /// Same delay before every retry.
    Fixed(Duration),
}

impl Backoff {
    /// Delay before the given retry (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Exponential { base } => {
                let factor = 1u32
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            Self::Fixed(delay) => delay,
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self::new(max_retries, Backoff::Exponential { base })
    }

    /// Policy for completion requests and tool calls: 3 retries, 1s/2s/4s.
    pub fn completion() -> Self {
        Self::default()
    }

    /// Policy for tool-server connection attempts: 2 retries, 1s/2s.
    pub fn reconnect() -> Self {
        Self::exponential(2, Duration::from_millis(1000))
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Execute an async operation, retrying every failure.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, ToolmeshError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolmeshError>>,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Execute an async operation, retrying failures accepted by `should_retry`.
    ///
    /// Rejected failures and the failure of the last attempt are returned as-is.
    pub async fn execute_if<F, Fut, T, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, ToolmeshError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolmeshError>>,
        P: Fn(&ToolmeshError) -> bool,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !should_retry(&e) => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        attempts = attempt,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
