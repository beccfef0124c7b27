//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts, cache sizing and feed timing for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-adapter timeout for the regular fan-out (seconds)
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,

    /// Hard deadline for the whole fan-out of one request (seconds)
    #[serde(default = "default_request_deadline")]
    pub request_deadline_secs: u64,

    /// Budget for one deep analysis, polling included (seconds)
    #[serde(default = "default_deep_timeout")]
    pub deep_timeout_secs: u64,

    /// How long a verdict is reused (seconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// How long an insufficient-data verdict, or one a configured source
    /// failed to answer, is reused (seconds)
    #[serde(default = "default_insufficient_ttl")]
    pub insufficient_data_ttl_secs: u64,

    /// Maximum number of cached verdicts
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// How often feeds are downloaded again (seconds)
    #[serde(default = "default_feed_refresh_interval")]
    pub feed_refresh_interval_secs: u64,

    /// Age after which a feed snapshot counts as stale (seconds)
    #[serde(default = "default_staleness_window")]
    pub feed_staleness_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_adapter_timeout(),
            request_deadline_secs: default_request_deadline(),
            deep_timeout_secs: default_deep_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            insufficient_data_ttl_secs: default_insufficient_ttl(),
            cache_capacity: default_cache_capacity(),
            feed_refresh_interval_secs: default_feed_refresh_interval(),
            feed_staleness_secs: default_staleness_window(),
        }
    }
}

impl EngineConfig {
    /// Per-adapter timeout
    #[must_use]
    pub const fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Fan-out deadline
    #[must_use]
    pub const fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    /// Deep-analysis budget
    #[must_use]
    pub const fn deep_timeout(&self) -> Duration {
        Duration::from_secs(self.deep_timeout_secs)
    }

    /// Regular cache TTL
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// TTL for insufficient-data and partially failed verdicts
    #[must_use]
    pub const fn insufficient_data_ttl(&self) -> Duration {
        Duration::from_secs(self.insufficient_data_ttl_secs)
    }

    /// Feed refresh interval
    #[must_use]
    pub const fn feed_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.feed_refresh_interval_secs)
    }

    /// Feed staleness window
    #[must_use]
    pub const fn feed_staleness(&self) -> Duration {
        Duration::from_secs(self.feed_staleness_secs)
    }
}

// Default value functions for serde.
const fn default_adapter_timeout() -> u64 {
    8
}

const fn default_request_deadline() -> u64 {
    12
}

const fn default_deep_timeout() -> u64 {
    45
}

const fn default_cache_ttl() -> u64 {
    30 * 60
}

const fn default_insufficient_ttl() -> u64 {
    3 * 60
}

const fn default_cache_capacity() -> usize {
    2000
}

const fn default_feed_refresh_interval() -> u64 {
    6 * 60 * 60
}

const fn default_staleness_window() -> u64 {
    12 * 60 * 60
}
