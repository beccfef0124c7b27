//! End-to-end behaviour of the assessment engine with scripted sources.

use async_trait::async_trait;
use linkguard::{
    AdapterSet, AssessOptions, DeepAnalysisStatus, Engine, EngineConfig, FeedStore, NormalizedUrl,
    Risk, RiskTier, SourceAdapter, SourceKind, SourceVerdict, SourcesConfig, Unconfigured,
};
use linkguard_core::ConfidenceLevel;
use linkguard_sources::FeedAdapter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Scripted {
    verdict: SourceVerdict,
    delay: Duration,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(verdict: SourceVerdict) -> Arc<Self> {
        Self::slow(verdict, Duration::ZERO)
    }

    fn slow(verdict: SourceVerdict, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for Scripted {
    fn name(&self) -> &str {
        &self.verdict.source
    }

    fn kind(&self) -> SourceKind {
        self.verdict.kind
    }

    async fn assess(&self, _url: &NormalizedUrl, _timeout: Duration) -> SourceVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.verdict.clone()
    }
}

fn unconfigured(name: &str) -> Arc<dyn SourceAdapter> {
    Arc::new(Unconfigured::new(name, SourceKind::Reputation, "not configured"))
}

fn no_deep() -> Arc<dyn SourceAdapter> {
    Arc::new(Unconfigured::new(
        "urlscan",
        SourceKind::DeepAnalysis,
        "not configured",
    ))
}

fn engine(adapters: Vec<Arc<dyn SourceAdapter>>, deep: Arc<dyn SourceAdapter>) -> Engine {
    Engine::new(AdapterSet::new(adapters, deep), EngineConfig::default())
}

fn clean_reputation() -> Arc<Scripted> {
    Scripted::new(SourceVerdict::clean("virustotal", SourceKind::Reputation, 0.8))
}

#[tokio::test]
async fn feed_listed_url_is_high_despite_unavailable_externals() {
    let store = Arc::new(FeedStore::default());
    store.refresh("urlhaus", ["http://evil.example/payload.exe"]);
    store.refresh("openphish", ["phish.example/login"]);

    let engine = engine(
        vec![
            Arc::new(FeedAdapter::new(Arc::clone(&store), "urlhaus")),
            Arc::new(FeedAdapter::new(Arc::clone(&store), "openphish")),
            unconfigured("virustotal"),
            unconfigured("safe_browsing"),
        ],
        no_deep(),
    );

    let verdict = engine
        .assess("https://EVIL.example/payload.exe", AssessOptions::default())
        .await
        .unwrap();

    assert!(verdict.tier >= RiskTier::High);
    assert!(!verdict.insufficient_data);
    assert_eq!(verdict.contributing().count(), 1);
    assert_eq!(verdict.unavailable().count(), 2);
    assert!(verdict.explanation.contains("2 of 4 sources responded, 1 contributing"));
    assert!(verdict
        .explanation
        .contains("Unavailable (2): safe_browsing (not configured), virustotal (not configured)"));
    assert_eq!(verdict.deep_analysis, DeepAnalysisStatus::NotRun);
}

#[tokio::test]
async fn unknown_everywhere_is_low_with_insufficient_data() {
    // Feeds never loaded, no keys: nothing can leave the process.
    let store = Arc::new(FeedStore::default());
    let adapters = AdapterSet::from_config(&SourcesConfig::default(), store);
    let engine = Engine::new(adapters, EngineConfig::default());

    let verdict = engine
        .assess("example.com", AssessOptions::default().allow_deep(false))
        .await
        .unwrap();

    assert_eq!(verdict.tier, RiskTier::Low);
    assert!(verdict.insufficient_data);
    assert_eq!(verdict.confidence_level(), ConfidenceLevel::Low);
    assert!(!verdict.has_external_answer());
    assert!(verdict.explanation.contains("Insufficient data"));
    assert!(linkguard::verdict_to_human_text(&verdict).contains("insufficient data"));
    assert_eq!(verdict.deep_analysis, DeepAnalysisStatus::NotRun);
}

#[tokio::test]
async fn nothing_responding_gives_zero_confidence() {
    let engine = engine(vec![unconfigured("virustotal")], no_deep());
    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert!(verdict.insufficient_data);
    assert!(verdict.confidence.abs() < f64::EPSILON);
}

#[tokio::test]
async fn invalid_urls_are_rejected_before_any_source() {
    let source = clean_reputation();
    let engine = engine(vec![source.clone()], no_deep());

    for raw in ["", "   ", "ftp://files.example/x", "javascript:alert(1)"] {
        let err = engine.assess(raw, AssessOptions::default()).await.unwrap_err();
        assert!(err.is_validation(), "{raw:?} should be rejected");
    }
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn repeated_calls_within_ttl_fan_out_once() {
    let source = clean_reputation();
    let engine = engine(vec![source.clone()], no_deep());

    let first = engine
        .assess("https://example.com/a", AssessOptions::default())
        .await
        .unwrap();
    let second = engine
        .assess("https://example.com/a", AssessOptions::default())
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn equivalent_spellings_share_a_cache_entry() {
    let source = clean_reputation();
    let engine = engine(vec![source.clone()], no_deep());

    for raw in [
        "http://Example.com/a",
        "http://example.com/a",
        "http://example.com/a?",
        "http://example.com:80/a/",
    ] {
        engine.assess(raw, AssessOptions::default()).await.unwrap();
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn force_refresh_bypasses_the_cache() {
    let source = clean_reputation();
    let engine = engine(vec![source.clone()], no_deep());

    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    engine
        .assess("https://example.com", AssessOptions::default().force_refresh(true))
        .await
        .unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_fan_out() {
    let source = Scripted::slow(
        SourceVerdict::clean("virustotal", SourceKind::Reputation, 0.8),
        Duration::from_secs(2),
    );
    let engine = engine(vec![source.clone()], no_deep());

    let (a, b) = tokio::join!(
        engine.assess("https://new.example/", AssessOptions::default()),
        engine.assess("https://NEW.example", AssessOptions::default()),
    );

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_verdicts() {
    let store = Arc::new(FeedStore::default());
    store.refresh("urlhaus", ["evil.example"]);
    let engine = engine(
        vec![Arc::new(FeedAdapter::new(Arc::clone(&store), "urlhaus"))],
        no_deep(),
    );

    let before = engine
        .assess("http://evil.example/x", AssessOptions::default())
        .await
        .unwrap();

    store.refresh("urlhaus", Vec::<String>::new());
    store.record_failure("urlhaus", "HTTP 503");

    let after = engine
        .assess(
            "http://evil.example/x",
            AssessOptions::default().force_refresh(true),
        )
        .await
        .unwrap();

    assert_eq!(before.tier, after.tier);
    assert!(after.tier >= RiskTier::High);
    assert_eq!(store.consecutive_failures("urlhaus"), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_sources_degrade_to_unknown() {
    let slow = Scripted::slow(
        SourceVerdict::malicious("safe_browsing", SourceKind::Reputation, 0.95),
        Duration::from_secs(60),
    );
    let fast = clean_reputation();
    let engine = engine(vec![slow.clone(), fast.clone()], no_deep());

    let started = tokio::time::Instant::now();
    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();

    assert!(started.elapsed() <= Duration::from_secs(9));
    let sb = verdict.source("safe_browsing").unwrap();
    assert_eq!(sb.risk, Risk::Unknown);
    assert_eq!(sb.unavailable.as_deref(), Some("timed out"));
    assert_eq!(verdict.tier, RiskTier::Low);
    assert!(!verdict.insufficient_data);
}

#[tokio::test]
async fn contributions_are_ordered_by_kind_then_name() {
    let engine = engine(
        vec![
            Scripted::new(SourceVerdict::clean("virustotal", SourceKind::Reputation, 0.8)),
            Scripted::new(SourceVerdict::clean("heuristics", SourceKind::Heuristic, 0.3)),
            Scripted::new(SourceVerdict::clean("urlhaus", SourceKind::LocalFeed, 0.5)),
            Scripted::new(SourceVerdict::clean("safe_browsing", SourceKind::Reputation, 0.7)),
        ],
        no_deep(),
    );
    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    let names: Vec<_> = verdict
        .contributions
        .iter()
        .map(|c| c.verdict.source.as_str())
        .collect();
    assert_eq!(names, vec!["urlhaus", "safe_browsing", "virustotal", "heuristics"]);
}

#[tokio::test]
async fn high_tier_escalates_and_deep_confirmation_is_critical() {
    let feed = Scripted::new(SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.0));
    let deep = Scripted::new(SourceVerdict::malicious("urlscan", SourceKind::DeepAnalysis, 1.0));
    let engine = engine(vec![feed, clean_reputation()], deep.clone());

    let verdict = engine
        .assess("https://evil.example", AssessOptions::default())
        .await
        .unwrap();

    assert_eq!(verdict.deep_analysis, DeepAnalysisStatus::Completed);
    assert_eq!(verdict.tier, RiskTier::Critical);
    assert!(verdict.source("urlscan").is_some());
    assert_eq!(deep.calls(), 1);

    // Cached with the deep result; no second run.
    engine
        .assess("https://evil.example", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(deep.calls(), 1);
}

#[tokio::test]
async fn deep_analysis_never_lowers_the_verdict() {
    let feed = Scripted::new(SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.0));
    let deep = Scripted::new(SourceVerdict::clean("urlscan", SourceKind::DeepAnalysis, 0.8));
    let engine = engine(vec![feed.clone()], deep.clone());

    let verdict = engine
        .assess("https://evil.example", AssessOptions::default())
        .await
        .unwrap();

    assert_eq!(verdict.deep_analysis, DeepAnalysisStatus::Completed);
    assert_eq!(verdict.tier, RiskTier::High);
    assert!((verdict.score - 1.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn deep_timeout_is_inconclusive() {
    let feed = Scripted::new(SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.0));
    let deep = Scripted::slow(
        SourceVerdict::malicious("urlscan", SourceKind::DeepAnalysis, 1.0),
        Duration::from_secs(600),
    );
    let engine = engine(vec![feed], deep);

    let verdict = engine
        .assess("https://evil.example", AssessOptions::default())
        .await
        .unwrap();

    assert_eq!(
        verdict.deep_analysis,
        DeepAnalysisStatus::Inconclusive {
            reason: "timed out".into()
        }
    );
    assert_eq!(verdict.tier, RiskTier::High);
    assert!(verdict
        .explanation
        .ends_with("Deep analysis: attempted, inconclusive (timed out)"));
}

#[tokio::test]
async fn deep_analysis_respects_allow_deep() {
    let feed = Scripted::new(SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.0));
    let deep = Scripted::new(SourceVerdict::malicious("urlscan", SourceKind::DeepAnalysis, 1.0));
    let engine = engine(vec![feed], deep.clone());

    let verdict = engine
        .assess(
            "https://evil.example",
            AssessOptions::default().allow_deep(false).request_deep(true),
        )
        .await
        .unwrap();

    assert_eq!(verdict.deep_analysis, DeepAnalysisStatus::NotRun);
    assert_eq!(deep.calls(), 0);
}

#[tokio::test]
async fn explicit_request_deepens_a_cached_low_verdict() {
    let deep = Scripted::new(SourceVerdict::clean("urlscan", SourceKind::DeepAnalysis, 0.8));
    let source = clean_reputation();
    let engine = engine(vec![source.clone()], deep.clone());

    let first = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(first.deep_analysis, DeepAnalysisStatus::NotRun);
    assert_eq!(deep.calls(), 0);

    let second = engine
        .assess("https://example.com", AssessOptions::default().request_deep(true))
        .await
        .unwrap();
    assert_eq!(second.deep_analysis, DeepAnalysisStatus::Completed);
    assert_eq!(second.tier, RiskTier::Low);
    assert_eq!(source.calls(), 1);
    assert_eq!(deep.calls(), 1);

    engine
        .assess("https://example.com", AssessOptions::default().request_deep(true))
        .await
        .unwrap();
    assert_eq!(deep.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_deep_requests_share_one_run() {
    let deep = Scripted::slow(
        SourceVerdict::clean("urlscan", SourceKind::DeepAnalysis, 0.8),
        Duration::from_secs(5),
    );
    let engine = engine(vec![clean_reputation()], deep.clone());

    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();

    let deep_request = AssessOptions::default().request_deep(true);
    let (a, b) = tokio::join!(
        engine.assess("https://example.com", deep_request),
        engine.assess("https://example.com/", deep_request),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.deep_analysis, DeepAnalysisStatus::Completed);
    assert_eq!(deep.calls(), 1);
    assert_eq!(engine.cache().deepening(), 0);
}

#[tokio::test(start_paused = true)]
async fn joiners_of_an_undeepened_high_verdict_deepen_once() {
    let feed = Scripted::slow(
        SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.0),
        Duration::from_secs(2),
    );
    let deep = Scripted::slow(
        SourceVerdict::malicious("urlscan", SourceKind::DeepAnalysis, 1.0),
        Duration::from_secs(5),
    );
    let engine = engine(vec![feed.clone()], deep.clone());

    let (shallow, b, c) = tokio::join!(
        engine.assess("https://evil.example", AssessOptions::default().allow_deep(false)),
        engine.assess("https://evil.example", AssessOptions::default()),
        engine.assess("https://evil.example", AssessOptions::default()),
    );
    let (shallow, b, c) = (shallow.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(feed.calls(), 1);
    assert_eq!(shallow.deep_analysis, DeepAnalysisStatus::NotRun);
    assert_eq!(b.tier, RiskTier::Critical);
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(deep.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_assessment_leaves_nothing_pending() {
    let source = Scripted::slow(
        SourceVerdict::clean("virustotal", SourceKind::Reputation, 0.8),
        Duration::from_secs(5),
    );
    let engine = engine(vec![source.clone()], no_deep());

    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        engine.assess("https://example.com", AssessOptions::default()),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(engine.cache().is_empty());

    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(verdict.tier, RiskTier::Low);
    assert_eq!(source.calls(), 2);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_external_sources_shorten_the_ttl() {
    let failing = Scripted::new(SourceVerdict::unavailable(
        "safe_browsing",
        SourceKind::Reputation,
        "HTTP 503",
    ));
    let answering = clean_reputation();
    let engine = engine(vec![failing.clone(), answering.clone()], no_deep());

    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert!(!verdict.insufficient_data);

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(answering.calls(), 2);
    assert_eq!(failing.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn insufficient_data_verdicts_expire_sooner() {
    let local = Scripted::new(SourceVerdict::clean("urlhaus", SourceKind::LocalFeed, 0.5));
    let engine = engine(vec![local.clone(), unconfigured("virustotal")], no_deep());

    let verdict = engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert!(verdict.insufficient_data);

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(local.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn answered_verdicts_live_for_the_full_ttl() {
    // Sources that are merely unconfigured do not shorten the TTL.
    let source = clean_reputation();
    let engine = engine(vec![source.clone(), unconfigured("safe_browsing")], no_deep());

    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(29 * 60)).await;
    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(source.calls(), 1);

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    engine
        .assess("https://example.com", AssessOptions::default())
        .await
        .unwrap();
    assert_eq!(source.calls(), 2);
}
