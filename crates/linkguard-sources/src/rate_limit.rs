//! Per-source token buckets.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

use crate::config::RateLimitConfig;

/// Non-blocking token bucket owned by one adapter.
///
/// Adapters never wait for capacity: an empty bucket turns into an `unknown`
/// verdict instead of a delayed request.
pub struct SourceLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: RateLimitConfig,
}

impl SourceLimiter {
    /// Build a limiter from its settings
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        Self {
            limiter: RateLimiter::direct(quota),
            config,
        }
    }

    /// Take one token if one is available
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Settings this limiter was built from
    #[must_use]
    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }
}

impl std::fmt::Debug for SourceLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
