//! Feed refresh driving.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::fetch::FeedFetcher;
use crate::store::FeedStore;

/// Result of refreshing one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was installed
    Updated {
        /// Feed name
        source_name: String,
        /// Indicators in the new snapshot
        entries: usize,
        /// New snapshot version
        version: u64,
    },
    /// The refresh failed; the previous snapshot is still served
    Failed {
        /// Feed name
        source_name: String,
        /// Why it failed
        reason: String,
    },
}

impl RefreshOutcome {
    /// Feed this outcome is about
    #[must_use]
    pub fn source_name(&self) -> &str {
        match self {
            Self::Updated { source_name, .. } | Self::Failed { source_name, .. } => source_name,
        }
    }

    /// Returns true if a new snapshot was installed
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Fetch one feed and install the result in `store`.
///
/// Fetch errors never touch the current snapshot.
pub async fn refresh_from(store: &FeedStore, fetcher: &dyn FeedFetcher) -> RefreshOutcome {
    let name = fetcher.source_name().to_string();

    match fetcher.fetch().await {
        Ok(lines) => {
            let before = store.snapshot(&name).map_or(0, |s| s.version());
            let snapshot = store.refresh(&name, &lines);
            if snapshot.version() > before {
                RefreshOutcome::Updated {
                    source_name: name,
                    entries: snapshot.len(),
                    version: snapshot.version(),
                }
            } else {
                RefreshOutcome::Failed {
                    source_name: name,
                    reason: String::from("feed returned no usable indicators"),
                }
            }
        }
        Err(e) => {
            let reason = e.to_string();
            store.record_failure(&name, reason.clone());
            RefreshOutcome::Failed {
                source_name: name,
                reason,
            }
        }
    }
}

/// Refresh every feed concurrently
pub async fn refresh_all(
    store: &FeedStore,
    fetchers: &[Arc<dyn FeedFetcher>],
) -> Vec<RefreshOutcome> {
    let tasks = fetchers.iter().map(|f| refresh_from(store, f.as_ref()));
    futures_util::future::join_all(tasks).await
}

/// Refresh all feeds now and then every `interval` until the handle is
/// aborted
pub fn spawn_refresh_loop(
    store: Arc<FeedStore>,
    fetchers: Vec<Arc<dyn FeedFetcher>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcomes = refresh_all(&store, &fetchers).await;
            let updated = outcomes.iter().filter(|o| o.is_updated()).count();
            for outcome in &outcomes {
                if let RefreshOutcome::Failed {
                    source_name,
                    reason,
                } = outcome
                {
                    warn!(feed = %source_name, reason = %reason, "scheduled refresh failed");
                }
            }
            info!(updated, total = outcomes.len(), "feed refresh cycle finished");
        }
    })
}
