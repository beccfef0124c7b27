//! Threat-intelligence source adapters for linkguard.
//!
//! Every source (local feeds, VirusTotal, Google Safe Browsing, urlscan.io,
//! offline heuristics) sits behind the [`SourceAdapter`] trait and answers
//! with a [`SourceVerdict`]. Adapters never fail: missing credentials, an
//! empty rate-limit bucket, HTTP errors and timeouts all come back as an
//! `unknown` verdict carrying the reason.
//!
//! [`AdapterSet::from_config`] checks credentials once and installs an
//! [`Unconfigured`] placeholder for every source that cannot be used, so the
//! engine never branches on configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkguard_sources::{AdapterSet, SourcesConfig};
//! use linkguard_feeds::FeedStore;
//!
//! let store = Arc::new(FeedStore::default());
//! let set = AdapterSet::from_config(&SourcesConfig::default(), store);
//! for adapter in set.adapters() {
//!     let verdict = adapter.assess(&url, Duration::from_secs(8)).await;
//!     println!("{}: {}", verdict.source, verdict.risk);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/linkguard-sources/0.3.0")]

mod config;
mod error;
mod feed;
mod heuristic;
mod rate_limit;
mod retry;
mod safe_browsing;
mod set;
mod unconfigured;
mod urlscan;
mod virustotal;

use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict};
use std::time::Duration;

pub use config::{ApiSourceConfig, RateLimitConfig, SourcesConfig};
pub use error::{into_core, SourceError, SourceResult};
pub use feed::FeedAdapter;
pub use heuristic::{HeuristicAdapter, SUSPICION_THRESHOLD};
pub use rate_limit::SourceLimiter;
pub use retry::RetryConfig;
pub use safe_browsing::SafeBrowsingAdapter;
pub use set::AdapterSet;
pub use unconfigured::Unconfigured;
pub use urlscan::UrlscanAdapter;
pub use virustotal::VirusTotalAdapter;

/// A single threat-intelligence source.
///
/// `assess` must return within roughly `timeout` and must not panic or
/// error; anything that prevents an answer becomes an `unknown` verdict.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source name used in verdicts and explanations
    fn name(&self) -> &str;

    /// Class of the source
    fn kind(&self) -> SourceKind;

    /// Returns true if the source can answer at all
    fn is_configured(&self) -> bool {
        true
    }

    /// Assess one URL
    async fn assess(&self, url: &NormalizedUrl, timeout: Duration) -> SourceVerdict;
}
