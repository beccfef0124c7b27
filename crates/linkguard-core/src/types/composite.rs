use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::normalized::NormalizedUrl;
use super::verdict::{Risk, SourceKind, SourceVerdict};

/// Discrete risk tier of a composite verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// No meaningful signal of abuse
    Low,
    /// Some signals, not conclusive
    Medium,
    /// Likely malicious
    High,
    /// Confirmed malicious by independent evidence
    Critical,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Coarse reading of the overall confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Few or weak respondents
    Low,
    /// Partial coverage
    Moderate,
    /// Most sources answered
    High,
}

impl ConfidenceLevel {
    /// Bucket a confidence value in [0, 1]
    #[must_use]
    pub fn from_value(confidence: f64) -> Self {
        if confidence < 0.34 {
            Self::Low
        } else if confidence < 0.67 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Whether the slow deep-analysis source was consulted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeepAnalysisStatus {
    /// Not eligible, not requested, or not configured
    NotRun,
    /// A report was obtained and folded into the score
    Completed,
    /// Attempted, but no usable report (timeout, error, budget)
    Inconclusive {
        /// Why the attempt produced nothing
        reason: String,
    },
}

impl DeepAnalysisStatus {
    /// Returns true if deep analysis was attempted at all
    #[must_use]
    pub const fn was_attempted(&self) -> bool {
        !matches!(self, Self::NotRun)
    }
}

/// One source's share of a composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// The source's verdict
    pub verdict: SourceVerdict,

    /// Effective weight applied (zero for sources that did not answer)
    pub weight: f64,

    /// `weight × severity × confidence`
    pub contribution: f64,
}

/// The engine's final, explainable assessment of one URL.
///
/// Immutable once produced; shared through the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeVerdict {
    /// The assessed URL
    pub url: NormalizedUrl,

    /// Weighted risk score in [0, 1]
    pub score: f64,

    /// Discrete tier derived from the score and override rules
    pub tier: RiskTier,

    /// How much of the configured evidence actually answered, in [0, 1]
    pub confidence: f64,

    /// Every consulted source in a stable order (kind, then name)
    pub contributions: Vec<Contribution>,

    /// Human-readable explanation, one entry per line
    pub explanation: String,

    /// Deep-analysis outcome
    pub deep_analysis: DeepAnalysisStatus,

    /// No external source answered and nothing was flagged
    pub insufficient_data: bool,

    /// When the assessment was produced
    pub assessed_at: DateTime<Utc>,
}

impl CompositeVerdict {
    /// Sources that gave a usable answer
    pub fn responders(&self) -> impl Iterator<Item = &SourceVerdict> {
        self.contributions
            .iter()
            .map(|c| &c.verdict)
            .filter(|v| v.responded())
    }

    /// Sources that could not answer
    pub fn unavailable(&self) -> impl Iterator<Item = &SourceVerdict> {
        self.contributions
            .iter()
            .map(|c| &c.verdict)
            .filter(|v| !v.responded())
    }

    /// Sources whose answer moved the score (flagged the URL)
    pub fn contributing(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.iter().filter(|c| c.contribution > 0.0)
    }

    /// Returns true if deep analysis was run (completed or inconclusive)
    #[must_use]
    pub const fn deep_analysis_run(&self) -> bool {
        self.deep_analysis.was_attempted()
    }

    /// Coarse confidence bucket
    #[must_use]
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_value(self.confidence)
    }

    /// Returns true if any external source answered
    #[must_use]
    pub fn has_external_answer(&self) -> bool {
        self.responders().any(|v| v.kind.is_external())
    }

    /// The verdict reported by a named source, if it was consulted
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceVerdict> {
        self.contributions
            .iter()
            .map(|c| &c.verdict)
            .find(|v| v.source == name)
    }

    /// Returns true if any source reported the URL as malicious
    #[must_use]
    pub fn any_malicious(&self) -> bool {
        self.responders().any(|v| v.risk == Risk::Malicious)
    }

    /// Number of sources of the given kind that answered
    #[must_use]
    pub fn responders_of(&self, kind: SourceKind) -> usize {
        self.responders().filter(|v| v.kind == kind).count()
    }
}
