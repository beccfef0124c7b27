use thiserror::Error;

/// Result type alias for linkguard operations
pub type Result<T> = std::result::Result<T, LinkGuardError>;

/// Reasons a submitted URL is rejected before any source is queried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing left after trimming
    #[error("empty URL")]
    Empty,

    /// The input does not parse as a URL
    #[error("malformed URL: {0}")]
    Malformed(String),

    /// Only http and https links are assessed
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Parsed, but there is no host to look up
    #[error("URL has no host")]
    MissingHost,
}

/// Errors that can occur in the linkguard engine and its collaborators
#[derive(Error, Debug)]
pub enum LinkGuardError {
    /// The URL could not be normalized; fatal to the request
    #[error("invalid URL: {0}")]
    Validation(#[from] ValidationError),

    /// A threat-intelligence source could not answer
    #[error("source {source_name} unavailable: {reason}")]
    SourceUnavailable {
        /// Name of the source
        source_name: String,
        /// Why it could not answer
        reason: String,
    },

    /// A feed refresh did not produce a new snapshot
    #[error("feed refresh failed for {source_name}: {reason}")]
    FeedRefresh {
        /// Name of the feed
        source_name: String,
        /// What went wrong
        reason: String,
    },

    /// Configuration is invalid or incomplete
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinkGuardError {
    /// Create a source-unavailable error
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error should be surfaced to the caller.
    ///
    /// Everything else degrades into a lower-confidence verdict.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_and_is_flagged() {
        let err: LinkGuardError = ValidationError::UnsupportedScheme("ftp".into()).into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid URL: unsupported scheme: ftp");
    }

    #[test]
    fn source_errors_are_not_validation() {
        let err = LinkGuardError::unavailable("virustotal", "quota exhausted");
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "source virustotal unavailable: quota exhausted"
        );
    }
}
