//! Feed source configuration.

use serde::{Deserialize, Serialize};

/// A published indicator list to mirror locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    /// Short name used as the source label and snapshot file name
    pub name: String,

    /// Plain-text download URL (one indicator per line)
    pub url: String,

    /// Disabled feeds are neither fetched nor consulted
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl FeedSourceConfig {
    /// Create an enabled feed
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
        }
    }

    /// abuse.ch URLhaus plain-text dump of active malware URLs
    #[must_use]
    pub fn urlhaus() -> Self {
        Self::new("urlhaus", "https://urlhaus.abuse.ch/downloads/text/")
    }

    /// OpenPhish community phishing feed
    #[must_use]
    pub fn openphish() -> Self {
        Self::new("openphish", "https://openphish.com/feed.txt")
    }

    /// The feeds consulted when nothing is configured
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![Self::urlhaus(), Self::openphish()]
    }
}
