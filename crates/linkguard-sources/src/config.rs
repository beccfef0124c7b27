//! Source configuration.

use linkguard_feeds::FeedSourceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token-bucket settings for one remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per minute
    pub requests_per_minute: u32,

    /// Requests allowed back to back
    pub burst: u32,
}

impl RateLimitConfig {
    /// Create a rate limit
    #[must_use]
    pub const fn new(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            requests_per_minute,
            burst,
        }
    }

    /// VirusTotal public API: 4 lookups per minute
    #[must_use]
    pub const fn virustotal() -> Self {
        Self::new(4, 1)
    }

    /// Google Safe Browsing v4
    #[must_use]
    pub const fn safe_browsing() -> Self {
        Self::new(60, 10)
    }

    /// urlscan.io private scans
    #[must_use]
    pub const fn urlscan() -> Self {
        Self::new(10, 2)
    }
}

/// Settings shared by every API-backed source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSourceConfig {
    /// Set to false to skip the source even when a key is present
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key; the source is unavailable without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the service endpoint (mostly for testing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override the default rate limit for this source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ApiSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            rate_limit: None,
        }
    }
}

impl ApiSourceConfig {
    /// Enabled source with the given key
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// The key to use, if the source is enabled and has a non-blank key
    #[must_use]
    pub fn usable_key(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Why the source cannot be used, or `None` if it can
    #[must_use]
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        if !self.enabled {
            Some("disabled")
        } else if self.usable_key().is_none() {
            Some("not configured")
        } else {
            None
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Every source the engine may consult
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Local blocklists mirrored into the feed store
    #[serde(default = "FeedSourceConfig::defaults")]
    pub feeds: Vec<FeedSourceConfig>,

    /// Offline URL-shape heuristics
    #[serde(default = "default_true")]
    pub heuristics: bool,

    /// VirusTotal URL reports
    #[serde(default)]
    pub virustotal: ApiSourceConfig,

    /// Google Safe Browsing lookups
    #[serde(default)]
    pub safe_browsing: ApiSourceConfig,

    /// urlscan.io deep analysis
    #[serde(default)]
    pub urlscan: ApiSourceConfig,

    /// Time between urlscan result polls
    #[serde(default = "default_poll_interval_ms")]
    pub urlscan_poll_interval_ms: u64,
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feeds: FeedSourceConfig::defaults(),
            heuristics: true,
            virustotal: ApiSourceConfig::default(),
            safe_browsing: ApiSourceConfig::default(),
            urlscan: ApiSourceConfig::default(),
            urlscan_poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SourcesConfig {
    /// Poll interval as a duration
    #[must_use]
    pub const fn urlscan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.urlscan_poll_interval_ms)
    }

    /// Only the enabled feeds
    pub fn enabled_feeds(&self) -> impl Iterator<Item = &FeedSourceConfig> {
        self.feeds.iter().filter(|f| f.enabled)
    }
}
