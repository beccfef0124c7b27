//! Single-retry policy for flaky remote services.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::SourceResult;

/// Retry configuration for remote calls
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Pause before each retry
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// One retry after 600 ms
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(600),
        }
    }

    /// No retries at all
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Set maximum retries
    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the pause between attempts
    #[must_use]
    pub const fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `op`, retrying retryable errors
    pub async fn run<T, F, Fut>(&self, mut op: F) -> SourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "retrying after backoff");
                    tokio::time::sleep(self.backoff).await;
                }
                other => return other,
            }
        }
    }
}
