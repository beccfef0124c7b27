use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict, ThreatCategory};
use linkguard_feeds::FeedStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::SourceAdapter;

/// Confidence of a clean answer from a fresh feed
pub const FRESH_CLEAN_CONFIDENCE: f64 = 0.5;

/// Confidence of a clean answer from a stale feed
pub const STALE_CLEAN_CONFIDENCE: f64 = 0.2;

/// Membership check against one locally cached feed
#[derive(Debug, Clone)]
pub struct FeedAdapter {
    store: Arc<FeedStore>,
    feed: String,
    category: Option<ThreatCategory>,
}

impl FeedAdapter {
    /// Adapter for the feed named `feed`
    pub fn new(store: Arc<FeedStore>, feed: impl Into<String>) -> Self {
        let feed = feed.into();
        store.register(&feed);
        Self {
            store,
            category: default_category(&feed),
            feed,
        }
    }

    /// Override the category reported on a hit
    #[must_use]
    pub fn with_category(mut self, category: ThreatCategory) -> Self {
        self.category = Some(category);
        self
    }
}

fn default_category(feed: &str) -> Option<ThreatCategory> {
    let lower = feed.to_ascii_lowercase();
    if lower.contains("phish") {
        Some(ThreatCategory::Phishing)
    } else if lower.contains("urlhaus") || lower.contains("malware") {
        Some(ThreatCategory::Malware)
    } else {
        None
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        &self.feed
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LocalFeed
    }

    async fn assess(&self, url: &NormalizedUrl, _timeout: Duration) -> SourceVerdict {
        let Some(snapshot) = self.store.snapshot(&self.feed) else {
            return SourceVerdict::unavailable(&self.feed, SourceKind::LocalFeed, "feed not loaded");
        };
        if !snapshot.is_loaded() {
            return SourceVerdict::unavailable(&self.feed, SourceKind::LocalFeed, "feed not loaded");
        }

        let stale = self.store.is_stale(&self.feed);

        if let Some(hit) = snapshot.lookup(url) {
            debug!(feed = %self.feed, indicator = %hit.indicator, "feed hit");
            let mut verdict = SourceVerdict::malicious(&self.feed, SourceKind::LocalFeed, 1.0)
                .with_detail(format!(
                    "listed since {}",
                    hit.first_seen.format("%Y-%m-%d")
                ))
                .with_stale(stale);
            if let Some(category) = &self.category {
                verdict = verdict.with_category(category.clone());
            }
            return verdict;
        }

        let confidence = if stale {
            STALE_CLEAN_CONFIDENCE
        } else {
            FRESH_CLEAN_CONFIDENCE
        };
        SourceVerdict::clean(&self.feed, SourceKind::LocalFeed, confidence).with_stale(stale)
    }
}
