//! Offline checks on the shape of a URL.

use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict, ThreatCategory};
use std::time::Duration;

use crate::SourceAdapter;

/// Points at which a URL is reported as suspicious
pub const SUSPICION_THRESHOLD: u32 = 35;

const CLEAN_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.8;

const SHORTENERS: &[&str] = &[
    "bit.ly",
    "bitly.com",
    "buff.ly",
    "cutt.ly",
    "goo.gl",
    "is.gd",
    "lc.chat",
    "ow.ly",
    "rebrand.ly",
    "t.co",
    "t.ly",
    "tiny.cc",
    "tinyurl.com",
];

const REDIRECT_PARAMS: &[&str] = &["continue", "next", "redirect", "return", "url"];

/// One matched rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Short description
    pub label: &'static str,
    /// Points it adds
    pub points: u32,
}

/// Lexical heuristics: no network, always available
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAdapter;

impl HeuristicAdapter {
    /// Source name used in verdicts
    pub const NAME: &'static str = "heuristics";

    /// Create the adapter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Every rule the URL trips
    #[must_use]
    pub fn signals(url: &NormalizedUrl) -> Vec<Signal> {
        let host = url.host();
        let mut signals = Vec::new();
        let mut add = |label, points| signals.push(Signal { label, points });

        if url.had_userinfo() {
            add("credentials in URL", 15);
        }
        if url.is_ip_host() {
            add("IP address instead of a domain", 20);
        }
        if SHORTENERS.contains(&host) {
            add("link shortener", 10);
        }
        if url.query().is_some_and(has_redirect_param) {
            add("redirect parameter", 15);
        }
        if !url.is_ip_host() && host.split('.').count() > 4 {
            add("many subdomains", 10);
        }
        if host.len() > 50 {
            add("very long host name", 10);
        }
        if host.matches('-').count() >= 4 {
            add("many hyphens", 10);
        }
        if !url.is_ip_host() && host.chars().filter(char::is_ascii_digit).count() >= 5 {
            add("many digits in host", 10);
        }
        if !url.is_https() {
            add("no HTTPS", 5);
        }
        signals
    }
}

fn has_redirect_param(query: &str) -> bool {
    query.split('&').any(|pair| {
        let key = pair.split('=').next().unwrap_or_default();
        REDIRECT_PARAMS
            .iter()
            .any(|p| key.eq_ignore_ascii_case(p))
    })
}

#[async_trait]
impl SourceAdapter for HeuristicAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Heuristic
    }

    async fn assess(&self, url: &NormalizedUrl, _timeout: Duration) -> SourceVerdict {
        let signals = Self::signals(url);
        let points: u32 = signals.iter().map(|s| s.points).sum();

        if points < SUSPICION_THRESHOLD {
            let verdict = SourceVerdict::clean(Self::NAME, SourceKind::Heuristic, CLEAN_CONFIDENCE);
            return if signals.is_empty() {
                verdict
            } else {
                verdict.with_detail(describe(&signals, points))
            };
        }

        let confidence = (f64::from(points) / 100.0 + 0.2).min(MAX_CONFIDENCE);
        SourceVerdict::suspicious(Self::NAME, SourceKind::Heuristic, confidence)
            .with_category(ThreatCategory::SuspiciousPattern)
            .with_detail(describe(&signals, points))
    }
}

fn describe(signals: &[Signal], points: u32) -> String {
    let labels: Vec<_> = signals.iter().map(|s| s.label).collect();
    format!("{} ({points} points)", labels.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::Risk;

    fn url(raw: &str) -> NormalizedUrl {
        NormalizedUrl::parse(raw).unwrap()
    }

    async fn assess(raw: &str) -> SourceVerdict {
        HeuristicAdapter::new()
            .assess(&url(raw), Duration::from_secs(1))
            .await
    }

    #[tokio::test]
    async fn plain_https_domain_is_clean() {
        let v = assess("https://example.com/about").await;
        assert_eq!(v.risk, Risk::Clean);
        assert!((v.confidence - CLEAN_CONFIDENCE).abs() < f64::EPSILON);
        assert!(v.detail.is_none());
    }

    #[tokio::test]
    async fn ip_host_with_redirect_is_suspicious() {
        let v = assess("http://203.0.113.9/login?next=https://bank.example").await;
        assert_eq!(v.risk, Risk::Suspicious);
        assert_eq!(v.category, Some(ThreatCategory::SuspiciousPattern));
        // 20 + 15 + 5
        assert!((v.confidence - 0.6).abs() < 1e-9);
        assert!(v.detail.unwrap().contains("40 points"));
    }

    #[tokio::test]
    async fn confidence_is_capped() {
        let v = assess(
            "http://user@secure-login-verify-account-update.a1.b2.c3.example12345.com/?redirect=x",
        )
        .await;
        assert_eq!(v.risk, Risk::Suspicious);
        assert!((v.confidence - MAX_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn shortener_alone_stays_clean() {
        let signals = HeuristicAdapter::signals(&url("https://bit.ly/abc"));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].label, "link shortener");
    }
}
