//! Google Safe Browsing v4 lookups.

use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict, ThreatCategory};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::{ApiSourceConfig, RateLimitConfig};
use crate::error::{status_error, SourceError, SourceResult};
use crate::rate_limit::SourceLimiter;
use crate::retry::RetryConfig;
use crate::SourceAdapter;

const DEFAULT_BASE_URL: &str = "https://safebrowsing.googleapis.com";
const NAME: &str = "safe_browsing";

/// Longest URL the lookup API accepts
pub const MAX_URL_LENGTH: usize = 2048;

const CLEAN_CONFIDENCE: f64 = 0.7;
const MATCH_CONFIDENCE: f64 = 0.95;

const THREAT_TYPES: &[&str] = &[
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [&'a str],
    platform_types: [&'a str; 1],
    threat_entry_types: [&'a str; 1],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct FindResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    #[serde(default)]
    threat_type: String,
}

/// Google Safe Browsing `threatMatches:find` lookups
#[derive(Clone)]
pub struct SafeBrowsingAdapter {
    inner: Arc<SafeBrowsingInner>,
}

struct SafeBrowsingInner {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: SourceLimiter,
    retry: RetryConfig,
}

impl SafeBrowsingAdapter {
    /// Create an adapter with the default endpoint and rate limit
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, DEFAULT_BASE_URL, RateLimitConfig::safe_browsing())
    }

    /// Create an adapter with a custom endpoint and rate limit
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SafeBrowsingInner {
                http: Client::new(),
                api_key: api_key.into(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                limiter: SourceLimiter::new(rate_limit),
                retry: RetryConfig::new(),
            }),
        }
    }

    /// Build from configuration; `None` when the source cannot be used
    #[must_use]
    pub fn from_config(config: &ApiSourceConfig) -> Option<Self> {
        let key = config.usable_key()?;
        Some(Self::with_options(
            key,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            config.rate_limit.unwrap_or_else(RateLimitConfig::safe_browsing),
        ))
    }

    #[instrument(skip(self, url), fields(source = NAME))]
    async fn find(&self, url: &NormalizedUrl, timeout: Duration) -> SourceResult<Vec<String>> {
        if url.as_str().len() > MAX_URL_LENGTH {
            return Err(SourceError::Unsupported(format!(
                "longer than {MAX_URL_LENGTH} bytes"
            )));
        }

        let endpoint = format!("{}/v4/threatMatches:find", self.inner.base_url);
        let body = FindRequest {
            client: ClientInfo {
                client_id: "linkguard",
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ThreatInfo {
                threat_types: THREAT_TYPES,
                platform_types: ["ANY_PLATFORM"],
                threat_entry_types: ["URL"],
                threat_entries: [ThreatEntry { url: url.as_str() }],
            },
        };
        debug!(url = %url, "Safe Browsing lookup");

        let response: FindResponse = self
            .inner
            .retry
            .run(|| self.post(&endpoint, &body, timeout))
            .await?;

        let mut threats: Vec<String> = response
            .matches
            .into_iter()
            .map(|m| m.threat_type)
            .filter(|t| !t.is_empty())
            .collect();
        threats.sort_unstable();
        threats.dedup();
        Ok(threats)
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &FindRequest<'_>,
        timeout: Duration,
    ) -> SourceResult<FindResponse> {
        let response = self
            .inner
            .http
            .post(endpoint)
            .query(&[("key", self.inner.api_key.as_str())])
            .json(body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(FindResponse::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn threat_label(threat: &str) -> &str {
    match threat {
        "MALWARE" => "malware",
        "SOCIAL_ENGINEERING" => "social engineering",
        "UNWANTED_SOFTWARE" => "unwanted software",
        "POTENTIALLY_HARMFUL_APPLICATION" => "potentially harmful application",
        other => other,
    }
}

fn threat_category(threat: &str) -> ThreatCategory {
    match threat {
        "MALWARE" => ThreatCategory::Malware,
        "SOCIAL_ENGINEERING" => ThreatCategory::Phishing,
        "UNWANTED_SOFTWARE" => ThreatCategory::UnwantedSoftware,
        "POTENTIALLY_HARMFUL_APPLICATION" => ThreatCategory::HarmfulApplication,
        other => ThreatCategory::from_label(other),
    }
}

#[async_trait]
impl SourceAdapter for SafeBrowsingAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Reputation
    }

    async fn assess(&self, url: &NormalizedUrl, timeout: Duration) -> SourceVerdict {
        if !self.inner.limiter.try_acquire() {
            return SourceVerdict::unavailable(
                NAME,
                SourceKind::Reputation,
                SourceError::QuotaExhausted.reason(),
            );
        }

        match self.find(url, timeout).await {
            Ok(threats) if threats.is_empty() => {
                SourceVerdict::clean(NAME, SourceKind::Reputation, CLEAN_CONFIDENCE)
                    .with_detail("no threats found")
            }
            Ok(threats) => {
                let labels: Vec<_> = threats.iter().map(|t| threat_label(t)).collect();
                SourceVerdict::malicious(NAME, SourceKind::Reputation, MATCH_CONFIDENCE)
                    .with_category(threat_category(&threats[0]))
                    .with_detail(format!("listed as {}", labels.join(", ")))
            }
            Err(e) => {
                debug!(error = %e, "Safe Browsing lookup failed");
                SourceVerdict::unavailable(NAME, SourceKind::Reputation, e.reason())
            }
        }
    }
}

impl std::fmt::Debug for SafeBrowsingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeBrowsingAdapter")
            .field("base_url", &self.inner.base_url)
            .field("limiter", &self.inner.limiter)
            .finish_non_exhaustive()
    }
}
