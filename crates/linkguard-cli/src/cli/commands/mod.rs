//! Command implementations.

pub mod check;
pub mod config;
pub mod feeds;

use anyhow::Result;
use linkguard::{AdapterSet, Engine, FeedFetcher, FeedStore, HttpFeedFetcher};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration, environment overrides applied
    pub config: Config,

    /// Where the configuration lives
    pub config_path: PathBuf,

    /// Feed snapshot directory
    pub data_dir: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// Open the feed store, loading any snapshots already on disk.
    ///
    /// Every enabled feed is registered so never-loaded feeds still show up.
    pub fn feed_store(&self) -> Result<Arc<FeedStore>> {
        let store = FeedStore::open(self.data_dir.clone(), self.config.engine.feed_staleness())?;
        for feed in self.config.sources.enabled_feeds() {
            store.register(&feed.name);
        }
        Ok(Arc::new(store))
    }

    /// HTTP fetchers for every enabled feed
    pub fn feed_fetchers(&self) -> Vec<Arc<dyn FeedFetcher>> {
        self.config
            .sources
            .enabled_feeds()
            .map(|feed| Arc::new(HttpFeedFetcher::from_config(feed)) as Arc<dyn FeedFetcher>)
            .collect()
    }

    /// Build an engine over `store` from the configured sources
    pub fn engine(&self, store: Arc<FeedStore>) -> Engine {
        let adapters = AdapterSet::from_config(&self.config.sources, store);
        Engine::new(adapters, self.config.engine.clone())
    }
}
