//! urlscan.io private scans, used for deep analysis.

use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict, ThreatCategory};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::{ApiSourceConfig, RateLimitConfig};
use crate::error::{status_error, SourceError, SourceResult};
use crate::rate_limit::SourceLimiter;
use crate::retry::RetryConfig;
use crate::SourceAdapter;

const DEFAULT_BASE_URL: &str = "https://urlscan.io";
const NAME: &str = "urlscan";

/// Default pause between result polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const CLEAN_CONFIDENCE: f64 = 0.8;
const SUSPICIOUS_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    url: &'a str,
    visibility: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScanSubmission {
    uuid: String,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScanResult {
    #[serde(default)]
    verdicts: Verdicts,
}

#[derive(Debug, Default, Deserialize)]
struct Verdicts {
    #[serde(default)]
    overall: OverallVerdict,
}

#[derive(Debug, Default, Deserialize)]
struct OverallVerdict {
    #[serde(default)]
    malicious: bool,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    categories: Vec<String>,
}

/// Submit-and-poll deep analysis on urlscan.io
#[derive(Clone)]
pub struct UrlscanAdapter {
    inner: Arc<UrlscanInner>,
}

struct UrlscanInner {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: SourceLimiter,
    retry: RetryConfig,
    poll_interval: Duration,
}

impl UrlscanAdapter {
    /// Create an adapter with the default endpoint, rate limit and poll interval
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL,
            RateLimitConfig::urlscan(),
            DEFAULT_POLL_INTERVAL,
        )
    }

    /// Create an adapter with custom settings
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        rate_limit: RateLimitConfig,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(UrlscanInner {
                http: Client::new(),
                api_key: api_key.into(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                limiter: SourceLimiter::new(rate_limit),
                retry: RetryConfig::new(),
                poll_interval,
            }),
        }
    }

    /// Build from configuration; `None` when the source cannot be used
    #[must_use]
    pub fn from_config(config: &ApiSourceConfig, poll_interval: Duration) -> Option<Self> {
        let key = config.usable_key()?;
        Some(Self::with_options(
            key,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            config.rate_limit.unwrap_or_else(RateLimitConfig::urlscan),
            poll_interval,
        ))
    }

    async fn submit(&self, url: &NormalizedUrl, timeout: Duration) -> SourceResult<ScanSubmission> {
        let endpoint = format!("{}/api/v1/scan/", self.inner.base_url);
        let body = ScanRequest {
            url: url.as_str(),
            visibility: "private",
        };
        self.inner
            .retry
            .run(|| self.submit_once(&endpoint, &body, timeout))
            .await
    }

    async fn submit_once(
        &self,
        endpoint: &str,
        body: &ScanRequest<'_>,
        timeout: Duration,
    ) -> SourceResult<ScanSubmission> {
        let response = self
            .inner
            .http
            .post(endpoint)
            .header("API-Key", &self.inner.api_key)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    /// One poll; `None` while the report is still being produced
    async fn fetch_result(&self, uuid: &str, timeout: Duration) -> SourceResult<Option<ScanResult>> {
        let endpoint = format!("{}/api/v1/result/{uuid}/", self.inner.base_url);
        let response = self
            .inner
            .http
            .get(&endpoint)
            .header("API-Key", &self.inner.api_key)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }
        Ok(Some(serde_json::from_str(&response.text().await?)?))
    }

    #[instrument(skip(self, url), fields(source = NAME))]
    async fn scan(&self, url: &NormalizedUrl, budget: Duration) -> SourceResult<(ScanResult, String)> {
        let submission = self.submit(url, budget).await?;
        let report_url = submission.result.clone().unwrap_or_else(|| {
            format!("{}/result/{}/", self.inner.base_url, submission.uuid)
        });
        info!(uuid = %submission.uuid, "scan submitted");

        loop {
            tokio::time::sleep(self.inner.poll_interval).await;
            if let Some(result) = self.fetch_result(&submission.uuid, budget).await? {
                return Ok((result, report_url));
            }
            debug!(uuid = %submission.uuid, "report not ready yet");
        }
    }
}

fn result_verdict(result: &ScanResult, report_url: &str) -> SourceVerdict {
    let overall = &result.verdicts.overall;
    let verdict = if overall.malicious {
        SourceVerdict::malicious(NAME, SourceKind::DeepAnalysis, 1.0)
    } else if overall.score > 0 {
        SourceVerdict::suspicious(NAME, SourceKind::DeepAnalysis, SUSPICIOUS_CONFIDENCE)
    } else {
        SourceVerdict::clean(NAME, SourceKind::DeepAnalysis, CLEAN_CONFIDENCE)
    };

    let verdict = verdict.with_detail(format!("report: {report_url}"));
    match overall.categories.first() {
        Some(label) if verdict.risk.is_flagged() => {
            verdict.with_category(ThreatCategory::from_label(label))
        }
        _ => verdict,
    }
}

#[async_trait]
impl SourceAdapter for UrlscanAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::DeepAnalysis
    }

    /// Submit, then poll until the report is ready or `timeout` runs out
    async fn assess(&self, url: &NormalizedUrl, timeout: Duration) -> SourceVerdict {
        if !self.inner.limiter.try_acquire() {
            return SourceVerdict::unavailable(
                NAME,
                SourceKind::DeepAnalysis,
                SourceError::QuotaExhausted.reason(),
            );
        }

        match tokio::time::timeout(timeout, self.scan(url, timeout)).await {
            Ok(Ok((result, report_url))) => result_verdict(&result, &report_url),
            Ok(Err(e)) => {
                debug!(error = %e, "urlscan analysis failed");
                SourceVerdict::unavailable(NAME, SourceKind::DeepAnalysis, e.reason())
            }
            Err(_) => SourceVerdict::unavailable(
                NAME,
                SourceKind::DeepAnalysis,
                "analysis did not finish in time",
            ),
        }
    }
}

impl std::fmt::Debug for UrlscanAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlscanAdapter")
            .field("base_url", &self.inner.base_url)
            .field("poll_interval", &self.inner.poll_interval)
            .finish_non_exhaustive()
    }
}
