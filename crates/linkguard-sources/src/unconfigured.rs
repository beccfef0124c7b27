use async_trait::async_trait;
use linkguard_core::{NormalizedUrl, SourceKind, SourceVerdict};
use std::time::Duration;

use crate::SourceAdapter;

/// Stand-in for a source that is disabled or lacks credentials.
///
/// Always answers `unknown` with the stored reason and never does I/O.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    name: String,
    kind: SourceKind,
    reason: String,
}

impl Unconfigured {
    /// Create a placeholder
    pub fn new(name: impl Into<String>, kind: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// Why the source is unavailable
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl SourceAdapter for Unconfigured {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn assess(&self, _url: &NormalizedUrl, _timeout: Duration) -> SourceVerdict {
        SourceVerdict::unavailable(self.name.clone(), self.kind, self.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::Risk;

    #[tokio::test]
    async fn always_unknown() {
        let adapter = Unconfigured::new("virustotal", SourceKind::Reputation, "not configured");
        let url = NormalizedUrl::parse("https://example.com").unwrap();
        let verdict = adapter.assess(&url, Duration::from_secs(1)).await;
        assert_eq!(verdict.risk, Risk::Unknown);
        assert_eq!(verdict.unavailable.as_deref(), Some("not configured"));
        assert!(!adapter.is_configured());
    }
}
