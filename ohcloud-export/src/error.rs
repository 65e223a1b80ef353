//! Export error types.

use std::path::{Path, PathBuf};

use ohcloud_api::ApiError;
use thiserror::Error;

/// Errors that can occur while exporting or post-processing a conversation.
#[derive(Debug, Error)]
pub enum ExportError {
    /// API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file is not what the operation expects.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns true if the service stayed unavailable after any fallback.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unavailable())
    }

    /// Returns true for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth())
    }

    /// Returns true if credentials or configuration are missing.
    pub fn is_missing_config(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_missing_config())
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
