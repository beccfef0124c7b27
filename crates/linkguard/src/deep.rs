//! Deep-analysis escalation.

use linkguard_core::{DeepAnalysisStatus, NormalizedUrl, RiskTier, SourceVerdict};
use linkguard_sources::SourceAdapter;
use std::time::Duration;
use tracing::{info, warn};

use crate::engine::AssessOptions;

/// Decide whether the slow deep-analysis source should run.
///
/// Escalation happens at most once per verdict, only when the caller allows
/// it, and only for high-risk tiers unless the caller explicitly asks.
#[must_use]
pub const fn should_escalate(tier: RiskTier, options: &AssessOptions, already_run: bool) -> bool {
    if already_run || !options.allow_deep {
        return false;
    }
    options.request_deep || matches!(tier, RiskTier::High | RiskTier::Critical)
}

/// Outcome of one deep-analysis attempt
#[derive(Debug, Clone)]
pub struct DeepOutcome {
    /// Status to record on the verdict
    pub status: DeepAnalysisStatus,
    /// The adapter's verdict, folded into the contributions
    pub verdict: SourceVerdict,
}

/// Run the deep adapter within `budget`.
///
/// Any failure, including an exhausted rate limit, is recorded as
/// inconclusive and never raised.
pub async fn run(
    adapter: &dyn SourceAdapter,
    url: &NormalizedUrl,
    budget: Duration,
) -> DeepOutcome {
    info!(url = %url, source = adapter.name(), "escalating to deep analysis");

    let verdict = match tokio::time::timeout(budget, adapter.assess(url, budget)).await {
        Ok(verdict) => verdict,
        Err(_) => SourceVerdict::unavailable(adapter.name(), adapter.kind(), "timed out"),
    };

    let status = if verdict.responded() {
        DeepAnalysisStatus::Completed
    } else {
        let reason = verdict
            .unavailable
            .clone()
            .unwrap_or_else(|| String::from("no result"));
        warn!(url = %url, reason = %reason, "deep analysis inconclusive");
        DeepAnalysisStatus::Inconclusive { reason }
    };

    DeepOutcome { status, verdict }
}
