use thiserror::Error;

/// Result type alias for source calls
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Errors from talking to a remote threat-intelligence service.
///
/// None of these reach the caller of the engine; adapters turn them into an
/// `unknown` verdict carrying [`SourceError::reason`].
#[derive(Error, Debug)]
pub enum SourceError {
    /// Credentials were rejected
    #[error("credentials rejected")]
    Unauthorized,

    /// The remote service throttled us
    #[error("rate limited by remote service")]
    RateLimited,

    /// Our own per-source budget is spent
    #[error("quota exhausted")]
    QuotaExhausted,

    /// The request did not finish in time
    #[error("timed out")]
    Timeout,

    /// Transport-level failure
    #[error("network error: {0}")]
    Http(String),

    /// Unexpected status code
    #[error("HTTP {code}: {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body or error message
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The URL cannot be submitted to this service
    #[error("URL rejected: {0}")]
    Unsupported(String),
}

impl SourceError {
    /// Returns true if one more attempt may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Http(_) => true,
            Self::Api { code, .. } => *code == 503,
            _ => false,
        }
    }

    /// Short reason shown in explanations
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Map a non-success HTTP status the way every adapter does
pub(crate) fn status_error(code: u16, message: String) -> SourceError {
    match code {
        401 | 403 => SourceError::Unauthorized,
        429 => SourceError::RateLimited,
        _ => SourceError::Api { code, message },
    }
}

/// Wrap a source error for callers outside the adapter layer
pub fn into_core(source_name: &str, err: &SourceError) -> linkguard_core::LinkGuardError {
    linkguard_core::LinkGuardError::unavailable(source_name, err.reason())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(401, String::new()), SourceError::Unauthorized));
        assert!(matches!(status_error(403, String::new()), SourceError::Unauthorized));
        assert!(matches!(status_error(429, String::new()), SourceError::RateLimited));
        assert!(status_error(503, String::new()).is_retryable());
        assert!(!status_error(500, String::new()).is_retryable());
    }

    #[test]
    fn converts_to_core_unavailable() {
        let err = into_core("virustotal", &SourceError::QuotaExhausted);
        assert_eq!(
            err.to_string(),
            "source virustotal unavailable: quota exhausted"
        );
    }
}
