//! Bounded retry with a fixed delay.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tributary_core::{CoreError, CoreResult};

/// Retries after the first attempt
pub const DEFAULT_RETRIES: u32 = 3;

/// Wait between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(120);

/// How failed stages are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Fixed wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Set the retry count
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the delay
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run `op`, retrying retryable failures.
    ///
    /// Non-retryable errors return at once. Cancellation during a wait
    /// returns `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are used up
    pub async fn run<T, F, Fut>(&self, what: &str, cancel: &CancellationToken, mut op: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt <= self.retries => {
                    warn!(
                        stage = what,
                        attempt,
                        retries = self.retries,
                        error = %err,
                        "Stage failed, retrying"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => return Err(CoreError::Cancelled),
                        () = tokio::time::sleep(self.delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
