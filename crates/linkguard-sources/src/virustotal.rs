//! VirusTotal URL reports.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict, ThreatCategory};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::{ApiSourceConfig, RateLimitConfig};
use crate::error::{status_error, SourceError, SourceResult};
use crate::rate_limit::SourceLimiter;
use crate::SourceAdapter;

const DEFAULT_BASE_URL: &str = "https://www.virustotal.com";
const NAME: &str = "virustotal";

/// Confidence of a "never analysed" answer
const NOT_FOUND_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Default, Deserialize)]
struct UrlReport {
    #[serde(default)]
    data: ReportData,
}

#[derive(Debug, Default, Deserialize)]
struct ReportData {
    #[serde(default)]
    attributes: ReportAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct ReportAttributes {
    #[serde(default)]
    last_analysis_stats: AnalysisStats,
    #[serde(default)]
    categories: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct AnalysisStats {
    #[serde(default)]
    malicious: u32,
    #[serde(default)]
    suspicious: u32,
    #[serde(default)]
    harmless: u32,
    #[serde(default)]
    undetected: u32,
    #[serde(default)]
    timeout: u32,
}

impl AnalysisStats {
    const fn detected(self) -> u32 {
        self.malicious + self.suspicious
    }

    const fn total(self) -> u32 {
        self.malicious + self.suspicious + self.harmless + self.undetected + self.timeout
    }
}

/// What a report says, before it becomes a verdict
#[derive(Debug)]
enum Lookup {
    NotFound,
    Report(ReportAttributes),
}

/// VirusTotal v3 URL report lookups
#[derive(Clone)]
pub struct VirusTotalAdapter {
    inner: Arc<VirusTotalInner>,
}

struct VirusTotalInner {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: SourceLimiter,
}

impl VirusTotalAdapter {
    /// Create an adapter with the default endpoint and rate limit
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, DEFAULT_BASE_URL, RateLimitConfig::virustotal())
    }

    /// Create an adapter with a custom endpoint and rate limit
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            inner: Arc::new(VirusTotalInner {
                http: Client::new(),
                api_key: api_key.into(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                limiter: SourceLimiter::new(rate_limit),
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
            config.rate_limit.unwrap_or_else(RateLimitConfig::virustotal),
        ))
    }

    /// VirusTotal URL identifier: unpadded URL-safe base64 of the URL
    #[must_use]
    pub fn url_id(url: &NormalizedUrl) -> String {
        URL_SAFE_NO_PAD.encode(url.as_str())
    }

    #[instrument(skip(self, url), fields(source = NAME))]
    async fn lookup(&self, url: &NormalizedUrl, timeout: Duration) -> SourceResult<Lookup> {
        let endpoint = format!("{}/api/v3/urls/{}", self.inner.base_url, Self::url_id(url));
        debug!(url = %url, "VirusTotal report request");

        let response = self
            .inner
            .http
            .get(&endpoint)
            .header("x-apikey", &self.inner.api_key)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }

        let body = response.text().await?;
        let report: UrlReport = serde_json::from_str(&body)?;
        Ok(Lookup::Report(report.data.attributes))
    }
}

fn report_verdict(attrs: &ReportAttributes) -> SourceVerdict {
    let stats = attrs.last_analysis_stats;
    let detected = stats.detected();
    let total = stats.total();
    let detail = format!(
        "{detected}/{total} engines flagged (malicious={}, suspicious={})",
        stats.malicious, stats.suspicious
    );

    let verdict = if stats.malicious >= 2 {
        let agreement = (f64::from(detected) / 10.0).min(1.0);
        SourceVerdict::malicious(NAME, SourceKind::Reputation, 0.5 + 0.5 * agreement)
    } else if stats.malicious == 1 || stats.suspicious > 0 {
        let agreement = (f64::from(detected) / 5.0).min(1.0);
        SourceVerdict::suspicious(NAME, SourceKind::Reputation, 0.5 + 0.3 * agreement)
    } else if total == 0 {
        SourceVerdict::clean(NAME, SourceKind::Reputation, NOT_FOUND_CONFIDENCE)
    } else {
        let coverage = (f64::from(total) / 60.0).min(1.0);
        SourceVerdict::clean(NAME, SourceKind::Reputation, 0.4 + 0.4 * coverage)
    };

    let verdict = verdict.with_detail(detail);
    match (detected > 0, pick_category(&attrs.categories)) {
        (true, Some(category)) => verdict.with_category(category),
        _ => verdict,
    }
}

/// Prefer a label that maps onto a known category
fn pick_category(categories: &BTreeMap<String, String>) -> Option<ThreatCategory> {
    let mut labels: Vec<&str> = categories.values().map(String::as_str).collect();
    labels.sort_unstable();
    labels.dedup();
    let mapped: Vec<_> = labels.iter().map(|l| ThreatCategory::from_label(l)).collect();
    mapped
        .iter()
        .find(|c| !matches!(c, ThreatCategory::Other(_)))
        .or_else(|| mapped.first())
        .cloned()
}

#[async_trait]
impl SourceAdapter for VirusTotalAdapter {
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

        match self.lookup(url, timeout).await {
            Ok(Lookup::NotFound) => {
                SourceVerdict::clean(NAME, SourceKind::Reputation, NOT_FOUND_CONFIDENCE)
                    .with_detail("no analysis on record")
            }
            Ok(Lookup::Report(attrs)) => report_verdict(&attrs),
            Err(e) => {
                debug!(error = %e, "VirusTotal lookup failed");
                SourceVerdict::unavailable(NAME, SourceKind::Reputation, e.reason())
            }
        }
    }
}

impl std::fmt::Debug for VirusTotalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirusTotalAdapter")
            .field("base_url", &self.inner.base_url)
            .field("limiter", &self.inner.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::Risk;

    fn attrs(malicious: u32, suspicious: u32, harmless: u32) -> ReportAttributes {
        ReportAttributes {
            last_analysis_stats: AnalysisStats {
                malicious,
                suspicious,
                harmless,
                undetected: 0,
                timeout: 0,
            },
            categories: BTreeMap::from([
                ("Forcepoint ThreatSeeker".to_string(), "phishing and other frauds".to_string()),
                ("Sophos".to_string(), "spyware and malware".to_string()),
            ]),
        }
    }

    #[test]
    fn url_id_is_unpadded_base64url() {
        let url = NormalizedUrl::parse("http://example.com/").unwrap();
        // 19 bytes, which padded base64 would end in "=="
        assert_eq!(VirusTotalAdapter::url_id(&url), "aHR0cDovL2V4YW1wbGUuY29tLw");
    }

    #[test]
    fn detection_thresholds() {
        let v = report_verdict(&attrs(12, 0, 60));
        assert_eq!(v.risk, Risk::Malicious);
        assert!((v.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(v.category, Some(ThreatCategory::Phishing));

        let v = report_verdict(&attrs(2, 0, 60));
        assert_eq!(v.risk, Risk::Malicious);
        assert!((v.confidence - 0.6).abs() < 1e-9);

        let v = report_verdict(&attrs(1, 0, 60));
        assert_eq!(v.risk, Risk::Suspicious);

        let v = report_verdict(&attrs(0, 3, 60));
        assert_eq!(v.risk, Risk::Suspicious);

        let v = report_verdict(&attrs(0, 0, 90));
        assert_eq!(v.risk, Risk::Clean);
        assert!((v.confidence - 0.8).abs() < 1e-9);
        assert!(v.category.is_none());
        assert_eq!(v.detail.as_deref(), Some("0/90 engines flagged (malicious=0, suspicious=0)"));
    }
}
