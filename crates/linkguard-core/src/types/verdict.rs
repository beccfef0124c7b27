use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of a threat-intelligence source.
///
/// Declaration order is the order contributions are listed in a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Membership in a locally cached blocklist
    LocalFeed,
    /// External reputation service (VirusTotal, Safe Browsing)
    Reputation,
    /// Offline checks on the shape of the URL itself
    Heuristic,
    /// Slow, behaviour-based online analysis (urlscan)
    DeepAnalysis,
}

impl SourceKind {
    /// Returns true if answering requires a call to a remote service
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::Reputation | Self::DeepAnalysis)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFeed => write!(f, "local feed"),
            Self::Reputation => write!(f, "reputation"),
            Self::Heuristic => write!(f, "heuristic"),
            Self::DeepAnalysis => write!(f, "deep analysis"),
        }
    }
}

/// What one source concluded about a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    /// Nothing found
    Clean,
    /// Some indication of abuse
    Suspicious,
    /// Known bad
    Malicious,
    /// The source could not answer
    Unknown,
}

impl Risk {
    /// Severity on a 0..1 scale, `None` for [`Risk::Unknown`]
    #[must_use]
    pub const fn severity(self) -> Option<f64> {
        match self {
            Self::Clean => Some(0.0),
            Self::Suspicious => Some(0.5),
            Self::Malicious => Some(1.0),
            Self::Unknown => None,
        }
    }

    /// Returns true for suspicious or malicious answers
    #[must_use]
    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Suspicious | Self::Malicious)
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Suspicious => write!(f, "suspicious"),
            Self::Malicious => write!(f, "malicious"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Threat category reported by a source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    /// Credential phishing or other social engineering
    Phishing,
    /// Malware distribution
    Malware,
    /// Unwanted software
    UnwantedSoftware,
    /// Potentially harmful application
    HarmfulApplication,
    /// Structural red flags in the URL itself
    SuspiciousPattern,
    /// Any other label, verbatim from the source
    Other(String),
}

impl ThreatCategory {
    /// Map a free-form label from a source onto a known category
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        if lower.contains("phish") || lower.contains("social") {
            Self::Phishing
        } else if lower.contains("malware") || lower.contains("malicious") {
            Self::Malware
        } else if lower.contains("unwanted") {
            Self::UnwantedSoftware
        } else if lower.contains("harmful") {
            Self::HarmfulApplication
        } else {
            Self::Other(label.trim().to_string())
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phishing => write!(f, "phishing"),
            Self::Malware => write!(f, "malware"),
            Self::UnwantedSoftware => write!(f, "unwanted software"),
            Self::HarmfulApplication => write!(f, "potentially harmful application"),
            Self::SuspiciousPattern => write!(f, "suspicious URL pattern"),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}

/// Output of one adapter for one URL.
///
/// Created fresh per query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVerdict {
    /// Source name (e.g. `urlhaus`, `virustotal`)
    pub source: String,

    /// Class of the source
    pub kind: SourceKind,

    /// What the source concluded
    pub risk: Risk,

    /// How sure the source is, in [0, 1]; zero when unknown
    pub confidence: f64,

    /// Threat category, if the source reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ThreatCategory>,

    /// Human-readable detail (detection counts, report link)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Why the source could not answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,

    /// Answer came from a feed snapshot past its staleness window
    #[serde(default)]
    pub stale: bool,
}

impl SourceVerdict {
    /// Create a verdict with the given risk and confidence
    pub fn new(source: impl Into<String>, kind: SourceKind, risk: Risk, confidence: f64) -> Self {
        Self {
            source: source.into(),
            kind,
            risk,
            confidence: confidence.clamp(0.0, 1.0),
            category: None,
            detail: None,
            unavailable: None,
            stale: false,
        }
    }

    /// Shorthand for a clean answer
    pub fn clean(source: impl Into<String>, kind: SourceKind, confidence: f64) -> Self {
        Self::new(source, kind, Risk::Clean, confidence)
    }

    /// Shorthand for a suspicious answer
    pub fn suspicious(source: impl Into<String>, kind: SourceKind, confidence: f64) -> Self {
        Self::new(source, kind, Risk::Suspicious, confidence)
    }

    /// Shorthand for a malicious answer
    pub fn malicious(source: impl Into<String>, kind: SourceKind, confidence: f64) -> Self {
        Self::new(source, kind, Risk::Malicious, confidence)
    }

    /// The source could not answer; `reason` says why
    pub fn unavailable(
        source: impl Into<String>,
        kind: SourceKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new(source, kind, Risk::Unknown, 0.0)
        }
    }

    /// Attach a threat category
    #[must_use]
    pub fn with_category(mut self, category: ThreatCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Attach a human-readable detail
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Mark the answer as coming from stale data
    #[must_use]
    pub const fn with_stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    /// Returns true if the source gave a usable answer
    #[must_use]
    pub fn responded(&self) -> bool {
        self.risk != Risk::Unknown
    }

    /// Returns true for a malicious answer at full confidence.
    ///
    /// A single such hit can never be diluted below the high tier.
    #[must_use]
    pub fn is_certain_hit(&self) -> bool {
        self.risk == Risk::Malicious && self.confidence >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let v = SourceVerdict::malicious("urlhaus", SourceKind::LocalFeed, 1.7);
        assert!((v.confidence - 1.0).abs() < f64::EPSILON);
        assert!(v.is_certain_hit());

        let v = SourceVerdict::clean("urlhaus", SourceKind::LocalFeed, -0.2);
        assert!(v.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn unavailable_is_unknown_with_reason() {
        let v = SourceVerdict::unavailable("virustotal", SourceKind::Reputation, "not configured");
        assert_eq!(v.risk, Risk::Unknown);
        assert!(!v.responded());
        assert_eq!(v.unavailable.as_deref(), Some("not configured"));
        assert!(v.risk.severity().is_none());
    }

    #[test]
    fn category_labels() {
        assert_eq!(ThreatCategory::from_label("SOCIAL_ENGINEERING"), ThreatCategory::Phishing);
        assert_eq!(ThreatCategory::from_label("malware_download"), ThreatCategory::Malware);
        assert_eq!(
            ThreatCategory::from_label("gambling"),
            ThreatCategory::Other("gambling".into())
        );
    }

    #[test]
    fn kinds_order_for_display() {
        let mut kinds = vec![
            SourceKind::DeepAnalysis,
            SourceKind::Heuristic,
            SourceKind::LocalFeed,
            SourceKind::Reputation,
        ];
        kinds.sort();
        assert_eq!(kinds[0], SourceKind::LocalFeed);
        assert_eq!(kinds[3], SourceKind::DeepAnalysis);
        assert!(SourceKind::Reputation.is_external());
        assert!(!SourceKind::Heuristic.is_external());
    }
}
