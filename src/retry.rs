//! Bounded retry with a fixed delay
//!
//! The whole operation is re-run from scratch on any failure, so the
//! operation's author has to declare it safe to repeat by wrapping it in
//! [`Idempotent`].

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Marks an operation as safe to execute more than once
pub struct Idempotent<F>(pub F);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run until success or `max_attempts` failures; the last error is returned.
    pub async fn run<F, Fut, T>(&self, operation: Idempotent<F>) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Idempotent(mut operation) = operation;
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    warn!("Giving up after {} attempts: {:#}", attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {:#}", attempt, max_attempts, e);
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
