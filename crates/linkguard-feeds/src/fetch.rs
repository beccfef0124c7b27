//! Downloading feed content.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::FeedSourceConfig;
use crate::error::{FeedError, FeedResult};

/// Default per-download timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Something that can produce the raw lines of one feed
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Feed name the lines belong to
    fn source_name(&self) -> &str;

    /// Download the current indicator list
    async fn fetch(&self) -> FeedResult<Vec<String>>;
}

/// Fetches a plain-text, one-indicator-per-line feed over HTTP
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    http: Client,
    source_name: String,
    url: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher with the default timeout
    pub fn new(source_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_timeout(source_name, url, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom download timeout
    pub fn with_timeout(
        source_name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("linkguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            source_name: source_name.into(),
            url: url.into(),
        }
    }

    /// Create a fetcher for a configured feed
    #[must_use]
    pub fn from_config(config: &FeedSourceConfig) -> Self {
        Self::new(config.name.clone(), config.url.clone())
    }

    /// Download URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    #[instrument(skip(self), fields(feed = %self.source_name))]
    async fn fetch(&self) -> FeedResult<Vec<String>> {
        debug!(url = %self.url, "downloading feed");

        let fetch_err = |e: reqwest::Error| FeedError::Fetch {
            source_name: self.source_name.clone(),
            reason: e.to_string(),
        };

        let response = self.http.get(&self.url).send().await.map_err(fetch_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                source_name: self.source_name.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(fetch_err)?;
        let lines: Vec<String> = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();

        if lines.is_empty() {
            return Err(FeedError::Empty(self.source_name.clone()));
        }

        debug!(lines = lines.len(), "feed downloaded");
        Ok(lines)
    }
}
