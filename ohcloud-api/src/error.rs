//! API client errors.

use std::path::PathBuf;

use ohcloud_fetch::FetchError;
use thiserror::Error;

/// Errors raised by the V0, V1 and agent-server clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The underlying fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A lookup by id returned no record.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Requested id.
        id: String,
    },

    /// The conversation has no reachable runtime or agent server.
    #[error("No runtime available for conversation {0}")]
    MissingRuntime(String),

    /// Reading or writing a local file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A payload did not decode into the expected type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns true for the "unavailable" signal surfaced after any fallback.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_unavailable())
    }

    /// Returns true for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_auth())
    }

    /// Returns true if the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Fetch(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns true for missing credentials or invalid configuration.
    pub fn is_missing_config(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_missing_config())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias.
pub type ApiResult<T> = Result<T, ApiError>;
