//! The process-wide feed store.

use chrono::{DateTime, Utc};
use linkguard_core::NormalizedUrl;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FeedResult;
use crate::parse::parse_indicators;
use crate::persist;
use crate::snapshot::{FeedMatch, FeedSnapshot};

/// Snapshots older than this are reported as stale (twice the usual
/// six-hour refresh interval)
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(12 * 60 * 60);

/// Operator-facing state of one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    /// Feed name
    pub source_name: String,
    /// Number of indicators in the current snapshot
    pub entries: usize,
    /// Snapshot version
    pub version: u64,
    /// When the current snapshot was fetched
    pub fetched_at: Option<DateTime<Utc>>,
    /// Past the staleness window (or never loaded)
    pub stale: bool,
    /// Failed refreshes since the last successful one
    pub consecutive_failures: u32,
    /// Most recent refresh failure
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct FeedSlot {
    snapshot: Arc<FeedSnapshot>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl FeedSlot {
    fn new(snapshot: FeedSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

/// Locally cached threat-intelligence lists.
///
/// Lookups only read the current snapshot of each feed. The single mutation
/// is replacing a whole snapshot, done under a short write lock, so readers
/// holding an older `Arc<FeedSnapshot>` keep a consistent view.
#[derive(Debug)]
pub struct FeedStore {
    feeds: RwLock<HashMap<String, FeedSlot>>,
    staleness_window: Duration,
    cache_dir: Option<PathBuf>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS_WINDOW)
    }
}

impl FeedStore {
    /// Create an in-memory store that never touches disk
    #[must_use]
    pub fn new(staleness_window: Duration) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            staleness_window,
            cache_dir: None,
        }
    }

    /// Open a store backed by `dir`, loading every snapshot found there.
    ///
    /// Successful refreshes are written back to the same directory.
    pub fn open(dir: impl Into<PathBuf>, staleness_window: Duration) -> FeedResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut feeds = HashMap::new();
        for snapshot in persist::load_dir(&dir)? {
            info!(
                feed = snapshot.source_name(),
                entries = snapshot.len(),
                version = snapshot.version(),
                "loaded feed snapshot from disk"
            );
            feeds.insert(snapshot.source_name().to_string(), FeedSlot::new(snapshot));
        }

        Ok(Self {
            feeds: RwLock::new(feeds),
            staleness_window,
            cache_dir: Some(dir),
        })
    }

    /// Directory snapshots are persisted to, if any
    #[must_use]
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Configured staleness window
    #[must_use]
    pub const fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    /// Make sure a feed is known, installing an empty snapshot if needed
    pub fn register(&self, source_name: &str) {
        self.write()
            .entry(source_name.to_string())
            .or_insert_with(|| FeedSlot::new(FeedSnapshot::empty(source_name)));
    }

    /// Names of all known feeds, sorted
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Current snapshot of a feed
    #[must_use]
    pub fn snapshot(&self, source_name: &str) -> Option<Arc<FeedSnapshot>> {
        self.read().get(source_name).map(|slot| Arc::clone(&slot.snapshot))
    }

    /// Look a URL up in every feed; feeds are checked in name order
    #[must_use]
    pub fn lookup(&self, url: &NormalizedUrl) -> Option<FeedMatch> {
        let mut snapshots: Vec<_> = self
            .read()
            .values()
            .map(|slot| Arc::clone(&slot.snapshot))
            .collect();
        snapshots.sort_by(|a, b| a.source_name().cmp(b.source_name()));
        snapshots.iter().find_map(|snap| snap.lookup(url))
    }

    /// Look a URL up in one feed
    #[must_use]
    pub fn lookup_in(&self, source_name: &str, url: &NormalizedUrl) -> Option<FeedMatch> {
        self.snapshot(source_name).and_then(|snap| snap.lookup(url))
    }

    /// Replace a feed's snapshot with one built from `entries`.
    ///
    /// If `entries` holds no usable indicator the previous snapshot is kept
    /// and the failure is recorded. Persistence errors are logged; the new
    /// snapshot is still installed in memory. Returns the snapshot in effect
    /// afterwards.
    pub fn refresh<I, S>(&self, source_name: &str, entries: I) -> Arc<FeedSnapshot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.refresh_at(source_name, entries, Utc::now())
    }

    /// [`refresh`](Self::refresh) with an explicit fetch time
    pub fn refresh_at<I, S>(
        &self,
        source_name: &str,
        entries: I,
        fetched_at: DateTime<Utc>,
    ) -> Arc<FeedSnapshot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_indicators(entries);
        if parsed.skipped > 0 {
            debug!(feed = source_name, skipped = parsed.skipped, "unparsable indicators");
        }

        if parsed.is_empty() {
            self.record_failure(source_name, "feed returned no indicators");
            return self.current_or_empty(source_name);
        }

        let previous = self.current_or_empty(source_name);
        let next = FeedSnapshot::successor(&previous, &parsed, fetched_at);

        if let Some(dir) = &self.cache_dir {
            if let Err(e) = persist::write_snapshot(dir, &next) {
                warn!(feed = source_name, error = %e, "failed to persist feed snapshot");
            }
        }

        let next = Arc::new(next);
        {
            let mut feeds = self.write();
            let slot = feeds
                .entry(source_name.to_string())
                .or_insert_with(|| FeedSlot::new(FeedSnapshot::empty(source_name)));
            slot.snapshot = Arc::clone(&next);
            slot.consecutive_failures = 0;
            slot.last_error = None;
        }

        info!(
            feed = source_name,
            entries = next.len(),
            version = next.version(),
            "feed snapshot installed"
        );
        next
    }

    /// Record a failed refresh; the current snapshot stays in place
    pub fn record_failure(&self, source_name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        let failures = {
            let mut feeds = self.write();
            let slot = feeds
                .entry(source_name.to_string())
                .or_insert_with(|| FeedSlot::new(FeedSnapshot::empty(source_name)));
            slot.consecutive_failures += 1;
            slot.last_error = Some(reason.clone());
            slot.consecutive_failures
        };
        warn!(
            feed = source_name,
            failures,
            reason = %reason,
            "feed refresh failed, keeping last known snapshot"
        );
    }

    /// Returns true if the feed was not refreshed within the staleness
    /// window, or was never loaded
    #[must_use]
    pub fn is_stale(&self, source_name: &str) -> bool {
        self.is_stale_at(source_name, Utc::now())
    }

    /// [`is_stale`](Self::is_stale) evaluated at `now`
    #[must_use]
    pub fn is_stale_at(&self, source_name: &str, now: DateTime<Utc>) -> bool {
        self.snapshot(source_name)
            .map_or(true, |snap| self.snapshot_is_stale(&snap, now))
    }

    /// Failed refreshes since the last successful one
    #[must_use]
    pub fn consecutive_failures(&self, source_name: &str) -> u32 {
        self.read()
            .get(source_name)
            .map_or(0, |slot| slot.consecutive_failures)
    }

    /// Per-feed status, sorted by name
    #[must_use]
    pub fn status(&self) -> Vec<FeedStatus> {
        let now = Utc::now();
        let mut out: Vec<_> = self
            .read()
            .iter()
            .map(|(name, slot)| FeedStatus {
                source_name: name.clone(),
                entries: slot.snapshot.len(),
                version: slot.snapshot.version(),
                fetched_at: slot.snapshot.fetched_at(),
                stale: self.snapshot_is_stale(&slot.snapshot, now),
                consecutive_failures: slot.consecutive_failures,
                last_error: slot.last_error.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        out
    }

    fn snapshot_is_stale(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> bool {
        snapshot.fetched_at().map_or(true, |fetched_at| {
            (now - fetched_at)
                .to_std()
                .map_or(false, |age| age > self.staleness_window)
        })
    }

    fn current_or_empty(&self, source_name: &str) -> Arc<FeedSnapshot> {
        self.snapshot(source_name)
            .unwrap_or_else(|| Arc::new(FeedSnapshot::empty(source_name)))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, FeedSlot>> {
        self.feeds.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, FeedSlot>> {
        self.feeds.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
