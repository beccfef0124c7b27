//! HTTP adapters against mocked services.

use linkguard_core::{NormalizedUrl, Risk, SourceKind, ThreatCategory};
use linkguard_sources::{
    RateLimitConfig, SafeBrowsingAdapter, SourceAdapter, UrlscanAdapter, VirusTotalAdapter,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn url(raw: &str) -> NormalizedUrl {
    NormalizedUrl::parse(raw).unwrap()
}

fn generous() -> RateLimitConfig {
    RateLimitConfig::new(600, 10)
}

#[tokio::test]
async fn virustotal_report_is_scored() {
    let server = MockServer::start().await;
    let target = url("http://evil.example/login");
    let id = VirusTotalAdapter::url_id(&target);

    Mock::given(method("GET"))
        .and(path(format!("/api/v3/urls/{id}")))
        .and(header("x-apikey", "vt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"attributes": {
                "last_analysis_stats": {"malicious": 7, "suspicious": 1, "harmless": 60, "undetected": 20},
                "categories": {"BitDefender": "phishing"}
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = VirusTotalAdapter::with_options("vt-key", server.uri(), generous());
    let v = adapter.assess(&target, TIMEOUT).await;

    assert_eq!(v.source, "virustotal");
    assert_eq!(v.kind, SourceKind::Reputation);
    assert_eq!(v.risk, Risk::Malicious);
    assert!((v.confidence - 0.9).abs() < 1e-9);
    assert_eq!(v.category, Some(ThreatCategory::Phishing));
    assert!(v.detail.unwrap().starts_with("8/88 engines flagged"));
}

#[tokio::test]
async fn virustotal_not_found_is_low_confidence_clean() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = VirusTotalAdapter::with_options("vt-key", server.uri(), generous());
    let v = adapter.assess(&url("https://fresh.example/"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Clean);
    assert!((v.confidence - 0.3).abs() < f64::EPSILON);
    assert_eq!(v.detail.as_deref(), Some("no analysis on record"));
}

#[tokio::test]
async fn virustotal_errors_become_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let adapter = VirusTotalAdapter::with_options("bad", server.uri(), generous());
    let v = adapter.assess(&url("https://example.com/"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Unknown);
    assert_eq!(v.unavailable.as_deref(), Some("credentials rejected"));
}

#[tokio::test]
async fn virustotal_quota_is_enforced_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        VirusTotalAdapter::with_options("vt-key", server.uri(), RateLimitConfig::new(1, 1));
    let target = url("https://example.com/");

    assert_eq!(adapter.assess(&target, TIMEOUT).await.risk, Risk::Clean);
    let second = adapter.assess(&target, TIMEOUT).await;
    assert_eq!(second.risk, Risk::Unknown);
    assert_eq!(second.unavailable.as_deref(), Some("quota exhausted"));
}

#[tokio::test]
async fn safe_browsing_match_is_malicious() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/threatMatches:find"))
        .and(query_param("key", "gsb-key"))
        .and(body_partial_json(json!({
            "client": {"clientId": "linkguard"},
            "threatInfo": {"threatEntries": [{"url": "https://phish.example/login"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"threatType": "SOCIAL_ENGINEERING", "platformType": "ANY_PLATFORM"},
                {"threatType": "SOCIAL_ENGINEERING", "platformType": "WINDOWS"}
            ]
        })))
        .mount(&server)
        .await;

    let adapter = SafeBrowsingAdapter::with_options("gsb-key", server.uri(), generous());
    let v = adapter.assess(&url("https://phish.example/login"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Malicious);
    assert!((v.confidence - 0.95).abs() < f64::EPSILON);
    assert_eq!(v.category, Some(ThreatCategory::Phishing));
    assert_eq!(v.detail.as_deref(), Some("listed as social engineering"));
}

#[tokio::test]
async fn safe_browsing_empty_body_is_clean() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let adapter = SafeBrowsingAdapter::with_options("gsb-key", server.uri(), generous());
    let v = adapter.assess(&url("https://example.com/"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Clean);
    assert!((v.confidence - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn safe_browsing_retries_once_on_503() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = SafeBrowsingAdapter::with_options("gsb-key", server.uri(), generous());
    let v = adapter.assess(&url("https://example.com/"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Clean);
}

#[tokio::test]
async fn safe_browsing_forbidden_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = SafeBrowsingAdapter::with_options("gsb-key", server.uri(), generous());
    let v = adapter.assess(&url("https://example.com/"), TIMEOUT).await;
    assert_eq!(v.risk, Risk::Unknown);
    assert_eq!(v.unavailable.as_deref(), Some("credentials rejected"));
}

#[tokio::test]
async fn urlscan_polls_until_report_is_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/scan/"))
        .and(header("API-Key", "us-key"))
        .and(body_partial_json(json!({"visibility": "private"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "abc-123",
            "result": "https://urlscan.io/result/abc-123/"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/result/abc-123/"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/result/abc-123/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "verdicts": {"overall": {"malicious": true, "score": 100, "categories": ["phishing"]}}
        })))
        .mount(&server)
        .await;

    let adapter = UrlscanAdapter::with_options(
        "us-key",
        server.uri(),
        generous(),
        Duration::from_millis(20),
    );
    let v = adapter.assess(&url("https://phish.example/"), TIMEOUT).await;
    assert_eq!(v.kind, SourceKind::DeepAnalysis);
    assert!(v.is_certain_hit());
    assert_eq!(
        v.detail.as_deref(),
        Some("report: https://urlscan.io/result/abc-123/")
    );
}

#[tokio::test]
async fn urlscan_budget_expiry_is_inconclusive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": "slow"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = UrlscanAdapter::with_options(
        "us-key",
        server.uri(),
        generous(),
        Duration::from_millis(20),
    );
    let v = adapter
        .assess(&url("https://slow.example/"), Duration::from_millis(300))
        .await;
    assert_eq!(v.risk, Risk::Unknown);
    assert_eq!(v.unavailable.as_deref(), Some("analysis did not finish in time"));
}
