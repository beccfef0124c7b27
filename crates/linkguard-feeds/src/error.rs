use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feed operations
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Errors from fetching, parsing or persisting feeds
#[derive(Error, Debug)]
pub enum FeedError {
    /// Feed download failed at the transport level
    #[error("fetch failed for {source_name}: {reason}")]
    Fetch {
        /// Feed that was being fetched
        source_name: String,
        /// Transport error
        reason: String,
    },

    /// Feed server answered with a non-success status
    #[error("feed {source_name} returned HTTP {status}")]
    Status {
        /// Feed that was being fetched
        source_name: String,
        /// HTTP status code
        status: u16,
    },

    /// The download succeeded but contained no usable indicators
    #[error("feed {0} returned no indicators")]
    Empty(String),

    /// Snapshot file could not be written or read
    #[error("snapshot file {}: {reason}", path.display())]
    Persist {
        /// Snapshot file path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Returns true if a later attempt may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::Empty(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<FeedError> for linkguard_core::LinkGuardError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Fetch {
                source_name,
                reason,
            } => Self::FeedRefresh {
                source_name,
                reason,
            },
            FeedError::Status {
                source_name,
                status,
            } => Self::FeedRefresh {
                source_name,
                reason: format!("HTTP {status}"),
            },
            FeedError::Empty(source_name) => Self::FeedRefresh {
                source_name,
                reason: String::from("no indicators"),
            },
            FeedError::Persist { path, reason } => Self::Io(std::io::Error::other(format!(
                "{}: {reason}",
                path.display()
            ))),
            FeedError::Io(e) => Self::Io(e),
            FeedError::Json(e) => Self::Json(e),
        }
    }
}
