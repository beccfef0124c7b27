//! Weights, thresholds and the pure scoring function.
//!
//! The composite score is the confidence-weighted mean severity of every
//! source that answered:
//!
//! ```text
//! score      = Σ w·sev·conf / Σ w·conf      (responders only)
//! confidence = Σ w·conf / Σ w_base          (over every consulted source)
//! ```
//!
//! Sources that did not answer are excluded from the score but still count
//! in the confidence denominator, so fewer respondents means less certainty.

use linkguard_core::{Contribution, Risk, RiskTier, SourceKind, SourceVerdict};
use std::collections::BTreeSet;

/// Weight of a local blocklist answer
pub const WEIGHT_LOCAL_FEED: f64 = 1.0;
/// Weight of an external reputation answer
pub const WEIGHT_REPUTATION: f64 = 0.8;
/// Weight of the lexical heuristics
pub const WEIGHT_HEURISTIC: f64 = 0.4;
/// Weight of a deep-analysis report
pub const WEIGHT_DEEP_ANALYSIS: f64 = 0.9;
/// Multiplier applied to answers from stale feeds
pub const STALE_FACTOR: f64 = 0.5;

/// Scores at or above this are at least medium
pub const MEDIUM_THRESHOLD: f64 = 0.25;
/// Scores at or above this are high
pub const HIGH_THRESHOLD: f64 = 0.60;
/// Minimum confidence of a malicious verdict to count toward critical
pub const CRITICAL_CONFIDENCE: f64 = 0.9;

/// Output of [`score`]
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Weighted score in [0, 1]
    pub score: f64,
    /// Evidence coverage in [0, 1]
    pub confidence: f64,
    /// Tier after override rules
    pub tier: RiskTier,
    /// Per-source rows sorted by kind, then name
    pub contributions: Vec<Contribution>,
    /// Nothing was flagged and no external source answered
    pub insufficient_data: bool,
}

/// Base weight of a source class
#[must_use]
pub const fn base_weight(kind: SourceKind) -> f64 {
    match kind {
        SourceKind::LocalFeed => WEIGHT_LOCAL_FEED,
        SourceKind::Reputation => WEIGHT_REPUTATION,
        SourceKind::Heuristic => WEIGHT_HEURISTIC,
        SourceKind::DeepAnalysis => WEIGHT_DEEP_ANALYSIS,
    }
}

/// Weight actually applied to a verdict; zero when it did not answer
#[must_use]
pub fn effective_weight(verdict: &SourceVerdict) -> f64 {
    if !verdict.responded() {
        return 0.0;
    }
    let weight = base_weight(verdict.kind);
    if verdict.stale {
        weight * STALE_FACTOR
    } else {
        weight
    }
}

/// Tier from the score alone
#[must_use]
pub fn tier_for(score: f64) -> RiskTier {
    if score < MEDIUM_THRESHOLD {
        RiskTier::Low
    } else if score < HIGH_THRESHOLD {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// Returns true if the verdicts prove the URL malicious beyond doubt: a
/// malicious deep-analysis report, or confident malicious answers from two
/// different source classes
#[must_use]
pub fn is_critical(verdicts: &[SourceVerdict]) -> bool {
    let deep_confirmed = verdicts
        .iter()
        .any(|v| v.kind == SourceKind::DeepAnalysis && v.risk == Risk::Malicious);
    if deep_confirmed {
        return true;
    }

    let kinds: BTreeSet<SourceKind> = verdicts
        .iter()
        .filter(|v| v.risk == Risk::Malicious && v.confidence >= CRITICAL_CONFIDENCE)
        .map(|v| v.kind)
        .collect();
    kinds.len() >= 2
}

/// Combine per-source verdicts into a score, confidence and tier.
///
/// The result does not depend on the order of `verdicts`.
#[must_use]
pub fn score(verdicts: &[SourceVerdict]) -> Scored {
    let mut weighted_severity = 0.0;
    let mut weighted_confidence = 0.0;
    let mut consulted_weight = 0.0;

    let mut contributions: Vec<Contribution> = verdicts
        .iter()
        .map(|v| {
            consulted_weight += base_weight(v.kind);
            let weight = effective_weight(v);
            let severity = v.risk.severity().unwrap_or(0.0);
            let contribution = weight * severity * v.confidence;
            if v.responded() {
                weighted_severity += contribution;
                weighted_confidence += weight * v.confidence;
            }
            Contribution {
                verdict: v.clone(),
                weight,
                contribution,
            }
        })
        .collect();
    contributions.sort_by(|a, b| {
        (a.verdict.kind, &a.verdict.source).cmp(&(b.verdict.kind, &b.verdict.source))
    });

    let score = if weighted_confidence > 0.0 {
        (weighted_severity / weighted_confidence).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let confidence = if consulted_weight > 0.0 {
        (weighted_confidence / consulted_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let flagged = verdicts.iter().any(|v| v.risk.is_flagged());
    let external_answer = verdicts
        .iter()
        .any(|v| v.responded() && v.kind.is_external());
    let insufficient_data = !flagged && !external_answer;

    let mut tier = tier_for(score);
    if verdicts.iter().any(SourceVerdict::is_certain_hit) {
        tier = tier.max(RiskTier::High);
    }
    if is_critical(verdicts) {
        tier = RiskTier::Critical;
    }
    if insufficient_data {
        tier = RiskTier::Low;
    }

    Scored {
        score,
        confidence,
        tier,
        contributions,
        insufficient_data,
    }
}
