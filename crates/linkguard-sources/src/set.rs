use linkguard_core::SourceKind;
use linkguard_feeds::FeedStore;
use std::sync::Arc;
use tracing::info;

use crate::config::SourcesConfig;
use crate::feed::FeedAdapter;
use crate::heuristic::HeuristicAdapter;
use crate::safe_browsing::SafeBrowsingAdapter;
use crate::unconfigured::Unconfigured;
use crate::urlscan::UrlscanAdapter;
use crate::virustotal::VirusTotalAdapter;
use crate::SourceAdapter;

/// The adapters consulted for every request plus the deep-analysis adapter.
///
/// Built once; sources that cannot be used are represented by
/// [`Unconfigured`] so callers never check configuration themselves.
#[derive(Clone)]
pub struct AdapterSet {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    deep: Arc<dyn SourceAdapter>,
}

impl AdapterSet {
    /// Assemble a set from explicit adapters
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, deep: Arc<dyn SourceAdapter>) -> Self {
        Self { adapters, deep }
    }

    /// Build every configured source, with placeholders for the rest
    pub fn from_config(config: &SourcesConfig, store: Arc<FeedStore>) -> Self {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

        for feed in config.enabled_feeds() {
            adapters.push(Arc::new(FeedAdapter::new(Arc::clone(&store), feed.name.clone())));
        }

        if config.heuristics {
            adapters.push(Arc::new(HeuristicAdapter::new()));
        }

        adapters.push(match VirusTotalAdapter::from_config(&config.virustotal) {
            Some(adapter) => Arc::new(adapter),
            None => placeholder(
                "virustotal",
                SourceKind::Reputation,
                config.virustotal.unavailable_reason(),
            ),
        });

        adapters.push(match SafeBrowsingAdapter::from_config(&config.safe_browsing) {
            Some(adapter) => Arc::new(adapter),
            None => placeholder(
                "safe_browsing",
                SourceKind::Reputation,
                config.safe_browsing.unavailable_reason(),
            ),
        });

        let deep: Arc<dyn SourceAdapter> =
            match UrlscanAdapter::from_config(&config.urlscan, config.urlscan_poll_interval()) {
                Some(adapter) => Arc::new(adapter),
                None => placeholder(
                    "urlscan",
                    SourceKind::DeepAnalysis,
                    config.urlscan.unavailable_reason(),
                ),
            };

        let set = Self { adapters, deep };
        info!(
            configured = ?set.configured_names(),
            deep = set.deep.is_configured(),
            "source adapters ready"
        );
        set
    }

    /// Adapters queried on every request
    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// The deep-analysis adapter
    #[must_use]
    pub fn deep(&self) -> &Arc<dyn SourceAdapter> {
        &self.deep
    }

    /// Names of the adapters that can actually answer
    #[must_use]
    pub fn configured_names(&self) -> Vec<&str> {
        self.adapters
            .iter()
            .filter(|a| a.is_configured())
            .map(|a| a.name())
            .collect()
    }

    /// Returns true if any external reputation source is configured
    #[must_use]
    pub fn has_external(&self) -> bool {
        self.adapters
            .iter()
            .any(|a| a.kind().is_external() && a.is_configured())
    }
}

fn placeholder(name: &str, kind: SourceKind, reason: Option<&str>) -> Arc<dyn SourceAdapter> {
    Arc::new(Unconfigured::new(name, kind, reason.unwrap_or("not configured")))
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("AdapterSet")
            .field("adapters", &names)
            .field("deep", &self.deep.name())
            .finish()
    }
}
