//! Locally cached threat-intelligence feeds.
//!
//! The [`FeedStore`] holds one immutable [`FeedSnapshot`] per feed source.
//! Lookups read the current snapshot and never touch the network; a refresh
//! builds a complete new snapshot and swaps it in, so readers never observe a
//! half-updated feed. A failed or empty refresh keeps the last known good
//! snapshot and only bumps a failure counter.
//!
//! Downloading feeds is delegated to a [`FeedFetcher`]; [`HttpFeedFetcher`]
//! reads the plain-text lists published by URLhaus and OpenPhish, and
//! [`spawn_refresh_loop`] drives them on a timer.

#![doc(html_root_url = "https://docs.rs/linkguard-feeds/0.3.0")]

mod config;
mod error;
mod fetch;
mod parse;
mod persist;
mod refresh;
mod snapshot;
mod store;

pub use config::FeedSourceConfig;
pub use error::{FeedError, FeedResult};
pub use fetch::{FeedFetcher, HttpFeedFetcher, DEFAULT_FETCH_TIMEOUT};
pub use parse::{parse_indicators, ParsedIndicators};
pub use persist::feed_path;
pub use refresh::{refresh_all, refresh_from, spawn_refresh_loop, RefreshOutcome};
pub use snapshot::{FeedEntry, FeedMatch, FeedSnapshot, IndicatorKind};
pub use store::{FeedStatus, FeedStore, DEFAULT_STALENESS_WINDOW};
