//! The aggregator: fan-out, scoring, escalation and caching.

use chrono::Utc;
use futures_util::future::join_all;
use linkguard_core::{
    CompositeVerdict, DeepAnalysisStatus, NormalizedUrl, Result, SourceVerdict,
};
use linkguard_sources::{AdapterSet, SourceAdapter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::cache::{Entry, ResultCache};
use crate::config::EngineConfig;
use crate::deep::{self, should_escalate};
use crate::explain::explanation;
use crate::scoring::{self, Scored};

/// Per-request switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessOptions {
    /// Ignore a cached verdict and assess again
    #[serde(default)]
    pub force_refresh: bool,

    /// Permit escalation to deep analysis
    #[serde(default = "default_true")]
    pub allow_deep: bool,

    /// Run deep analysis regardless of the tier (still needs `allow_deep`)
    #[serde(default)]
    pub request_deep: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for AssessOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessOptions {
    /// Cached results allowed, automatic escalation allowed
    #[must_use]
    pub const fn new() -> Self {
        Self {
            force_refresh: false,
            allow_deep: true,
            request_deep: false,
        }
    }

    /// Bypass the cache
    #[must_use]
    pub const fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Allow or forbid deep analysis
    #[must_use]
    pub const fn allow_deep(mut self, allow: bool) -> Self {
        self.allow_deep = allow;
        self
    }

    /// Ask for deep analysis explicitly
    #[must_use]
    pub const fn request_deep(mut self, request: bool) -> Self {
        self.request_deep = request;
        self
    }
}

/// Multi-source URL risk assessment engine.
///
/// Cheap to share behind an `Arc`; all state lives in the adapters, the feed
/// store they read and the result cache.
#[derive(Debug)]
pub struct Engine {
    adapters: AdapterSet,
    cache: ResultCache,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine over a set of adapters
    #[must_use]
    pub fn new(adapters: AdapterSet, config: EngineConfig) -> Self {
        Self {
            cache: ResultCache::new(config.cache_capacity),
            adapters,
            config,
        }
    }

    /// The adapters in use
    #[must_use]
    pub const fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    /// The result cache
    #[must_use]
    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assess a raw, user-submitted URL.
    ///
    /// Only an unparsable URL is an error. Unavailable sources lower the
    /// confidence of the verdict instead. Concurrent calls for the same URL
    /// share one assessment; the options of the call that started it apply.
    #[instrument(skip(self, options), fields(force = options.force_refresh))]
    pub async fn assess(&self, raw: &str, options: AssessOptions) -> Result<Arc<CompositeVerdict>> {
        let url = NormalizedUrl::parse(raw)?;

        let verdict = match self.cache.begin(&url, options.force_refresh) {
            Entry::Hit(verdict) => {
                debug!(url = %url, "result cache hit");
                verdict
            }
            Entry::Compute(pending) => {
                let computed = pending
                    .cell()
                    .get_or_init(|| async {
                        let verdict = Arc::new(self.evaluate(&url, &options).await);
                        self.cache.put(url.clone(), Arc::clone(&verdict), self.ttl_for(&verdict));
                        verdict
                    })
                    .await;
                Arc::clone(computed)
            }
        };

        // A cached or joined verdict may still need the deep run this caller
        // asked for.
        if should_escalate(verdict.tier, &options, verdict.deep_analysis_run())
            && self.adapters.deep().is_configured()
        {
            return Ok(self.deepen_cached(&url, &verdict).await);
        }

        Ok(verdict)
    }

    /// Fan out, score, maybe escalate
    async fn evaluate(&self, url: &NormalizedUrl, options: &AssessOptions) -> CompositeVerdict {
        let verdicts = self.fan_out(url).await;
        let scored = scoring::score(&verdicts);
        info!(
            url = %url,
            score = scored.score,
            tier = %scored.tier,
            confidence = scored.confidence,
            "assessment scored"
        );

        let verdict = compose(url, scored, DeepAnalysisStatus::NotRun);
        if should_escalate(verdict.tier, options, false) && self.adapters.deep().is_configured() {
            return self.deepen(&verdict).await;
        }
        verdict
    }

    /// Query every regular adapter concurrently, bounded by the adapter
    /// timeout and the request deadline
    async fn fan_out(&self, url: &NormalizedUrl) -> Vec<SourceVerdict> {
        let adapter_timeout = self.config.adapter_timeout();
        let request_deadline = Instant::now() + self.config.request_deadline();

        let calls = self.adapters.adapters().iter().map(|adapter| {
            let deadline = (Instant::now() + adapter_timeout).min(request_deadline);
            bounded(adapter.as_ref(), url, deadline, adapter_timeout)
        });
        join_all(calls).await
    }

    /// Run deep analysis and fold it into `base` without lowering it
    async fn deepen(&self, base: &CompositeVerdict) -> CompositeVerdict {
        let outcome = deep::run(
            self.adapters.deep().as_ref(),
            &base.url,
            self.config.deep_timeout(),
        )
        .await;

        let mut verdicts: Vec<SourceVerdict> = base
            .contributions
            .iter()
            .map(|c| c.verdict.clone())
            .filter(|v| v.source != outcome.verdict.source)
            .collect();
        verdicts.push(outcome.verdict);

        let mut scored = scoring::score(&verdicts);
        scored.tier = scored.tier.max(base.tier);
        scored.score = scored.score.max(base.score);
        if !matches!(outcome.status, DeepAnalysisStatus::Completed) {
            scored.confidence = base.confidence;
            scored.insufficient_data = base.insufficient_data;
        }

        compose(&base.url, scored, outcome.status)
    }

    /// Deepen a verdict that finished without deep analysis. Concurrent
    /// callers for one URL share a single run.
    async fn deepen_cached(
        &self,
        url: &NormalizedUrl,
        verdict: &CompositeVerdict,
    ) -> Arc<CompositeVerdict> {
        let pending = self.cache.begin_deep(url);
        let deepened = pending
            .cell()
            .get_or_init(|| async {
                if let Some(current) = self.cache.get(url).filter(|c| c.deep_analysis_run()) {
                    return current;
                }
                let deepened = Arc::new(self.deepen(verdict).await);
                self.cache
                    .put(url.clone(), Arc::clone(&deepened), self.ttl_for(&deepened));
                deepened
            })
            .await;
        Arc::clone(deepened)
    }

    /// Verdicts missing data, or missing it because a configured source
    /// failed, are reused for the shorter TTL
    fn ttl_for(&self, verdict: &CompositeVerdict) -> std::time::Duration {
        if verdict.insufficient_data || self.had_source_errors(verdict) {
            self.config.insufficient_data_ttl()
        } else {
            self.config.cache_ttl()
        }
    }

    /// An external source that is configured but did not answer
    fn had_source_errors(&self, verdict: &CompositeVerdict) -> bool {
        verdict
            .unavailable()
            .filter(|v| v.kind.is_external())
            .any(|v| self.is_configured_source(&v.source))
    }

    fn is_configured_source(&self, name: &str) -> bool {
        self.adapters
            .adapters()
            .iter()
            .chain(std::iter::once(self.adapters.deep()))
            .any(|adapter| adapter.name() == name && adapter.is_configured())
    }
}

async fn bounded(
    adapter: &dyn SourceAdapter,
    url: &NormalizedUrl,
    deadline: Instant,
    timeout: std::time::Duration,
) -> SourceVerdict {
    match tokio::time::timeout_at(deadline, adapter.assess(url, timeout)).await {
        Ok(verdict) => verdict,
        Err(_) => {
            debug!(source = adapter.name(), "adapter timed out");
            SourceVerdict::unavailable(adapter.name(), adapter.kind(), "timed out")
        }
    }
}

fn compose(url: &NormalizedUrl, scored: Scored, deep_analysis: DeepAnalysisStatus) -> CompositeVerdict {
    let explanation = explanation(&scored, &deep_analysis);
    CompositeVerdict {
        url: url.clone(),
        score: scored.score,
        tier: scored.tier,
        confidence: scored.confidence,
        contributions: scored.contributions,
        explanation,
        deep_analysis,
        insufficient_data: scored.insufficient_data,
        assessed_at: Utc::now(),
    }
}
