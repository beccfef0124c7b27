//! Immutable, versioned feed snapshots.

use chrono::{DateTime, Utc};
use linkguard_core::NormalizedUrl;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::parse::ParsedIndicators;

/// What an indicator is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Exact scheme-less URL
    Url,
    /// Every URL on the host
    Host,
}

/// One indicator from one feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Scheme-less URL or bare host
    pub indicator: String,
    /// How the indicator is matched
    pub kind: IndicatorKind,
    /// Feed that listed it
    pub source_name: String,
    /// When this store first saw the indicator
    pub first_seen: DateTime<Utc>,
}

/// A positive feed lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMatch {
    /// Feed that listed the URL
    pub source_name: String,
    /// When the indicator was first seen
    pub first_seen: DateTime<Utc>,
    /// Whether the URL or only its host matched
    pub kind: IndicatorKind,
    /// The indicator that matched
    pub indicator: String,
}

/// Complete indicator set for one feed at one point in time.
///
/// Snapshots are never edited; a refresh builds a new one.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    source_name: String,
    version: u64,
    fetched_at: Option<DateTime<Utc>>,
    urls: HashMap<String, FeedEntry>,
    hosts: HashMap<String, FeedEntry>,
}

impl FeedSnapshot {
    /// Placeholder for a feed that has never been loaded
    pub fn empty(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            version: 0,
            fetched_at: None,
            urls: HashMap::new(),
            hosts: HashMap::new(),
        }
    }

    /// Build the successor of `previous` from freshly parsed indicators.
    ///
    /// Indicators already present in `previous` keep their `first_seen`.
    #[must_use]
    pub fn successor(
        previous: &Self,
        indicators: &ParsedIndicators,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let carry = |map: &HashMap<String, FeedEntry>, indicator: &str, kind| FeedEntry {
            indicator: indicator.to_string(),
            kind,
            source_name: previous.source_name.clone(),
            first_seen: map.get(indicator).map_or(fetched_at, |e| e.first_seen),
        };

        let urls = indicators
            .urls
            .iter()
            .map(|u| (u.clone(), carry(&previous.urls, u, IndicatorKind::Url)))
            .collect();
        let hosts = indicators
            .hosts
            .iter()
            .map(|h| (h.clone(), carry(&previous.hosts, h, IndicatorKind::Host)))
            .collect();

        Self {
            source_name: previous.source_name.clone(),
            version: previous.version + 1,
            fetched_at: Some(fetched_at),
            urls,
            hosts,
        }
    }

    /// Rebuild a snapshot from persisted entries
    pub(crate) fn from_entries(
        source_name: String,
        version: u64,
        fetched_at: DateTime<Utc>,
        entries: impl IntoIterator<Item = FeedEntry>,
    ) -> Self {
        let mut snapshot = Self {
            source_name,
            version,
            fetched_at: Some(fetched_at),
            urls: HashMap::new(),
            hosts: HashMap::new(),
        };
        for entry in entries {
            let map = match entry.kind {
                IndicatorKind::Url => &mut snapshot.urls,
                IndicatorKind::Host => &mut snapshot.hosts,
            };
            map.insert(entry.indicator.clone(), entry);
        }
        snapshot
    }

    /// Look a URL up: exact URL first, then its host
    #[must_use]
    pub fn lookup(&self, url: &NormalizedUrl) -> Option<FeedMatch> {
        self.urls
            .get(url.without_scheme())
            .or_else(|| self.hosts.get(url.host()))
            .map(|entry| FeedMatch {
                source_name: entry.source_name.clone(),
                first_seen: entry.first_seen,
                kind: entry.kind,
                indicator: entry.indicator.clone(),
            })
    }

    /// Feed name
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Monotonic version, zero for a never-loaded feed
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// When the indicators were fetched, `None` if never loaded
    #[must_use]
    pub const fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Returns true if the feed has been loaded at least once
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Number of indicators
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len() + self.hosts.len()
    }

    /// Returns true if the snapshot holds no indicators
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, sorted by indicator
    #[must_use]
    pub fn entries(&self) -> Vec<&FeedEntry> {
        let mut entries: Vec<_> = self.urls.values().chain(self.hosts.values()).collect();
        entries.sort_by(|a, b| a.indicator.cmp(&b.indicator));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_indicators;
    use chrono::Duration;

    fn url(raw: &str) -> NormalizedUrl {
        NormalizedUrl::parse(raw).unwrap()
    }

    #[test]
    fn lookup_matches_url_then_host() {
        let empty = FeedSnapshot::empty("urlhaus");
        let parsed = parse_indicators(["http://evil.example/payload.exe", "bad.example"]);
        let snap = FeedSnapshot::successor(&empty, &parsed, Utc::now());

        // Scheme does not matter for URL indicators.
        let hit = snap.lookup(&url("https://evil.example/payload.exe")).unwrap();
        assert_eq!(hit.kind, IndicatorKind::Url);
        assert_eq!(hit.source_name, "urlhaus");

        let hit = snap.lookup(&url("https://bad.example/any/path?x=1")).unwrap();
        assert_eq!(hit.kind, IndicatorKind::Host);

        assert!(snap.lookup(&url("https://evil.example/other")).is_none());
        assert_eq!(snap.version(), 1);
        assert!(snap.is_loaded());
    }

    #[test]
    fn successor_keeps_first_seen() {
        let t0 = Utc::now() - Duration::days(3);
        let t1 = Utc::now();
        let empty = FeedSnapshot::empty("openphish");

        let first = FeedSnapshot::successor(&empty, &parse_indicators(["a.example/x"]), t0);
        let second = FeedSnapshot::successor(
            &first,
            &parse_indicators(["a.example/x", "b.example/y"]),
            t1,
        );

        let a = second.lookup(&url("http://a.example/x")).unwrap();
        let b = second.lookup(&url("http://b.example/y")).unwrap();
        assert_eq!(a.first_seen, t0);
        assert_eq!(b.first_seen, t1);
        assert_eq!(second.version(), 2);
        assert_eq!(second.fetched_at(), Some(t1));
        // The old snapshot is untouched.
        assert_eq!(first.len(), 1);
    }
}
