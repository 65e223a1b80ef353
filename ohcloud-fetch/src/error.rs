//! Fetch error types.

use thiserror::Error;

/// Number of response body bytes kept in error messages.
pub const BODY_PREFIX_BYTES: usize = 200;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
///
/// The variants follow the failure taxonomy of the fetcher: transport
/// failures, authentication failures, the "unavailable" signal (the only
/// class that can trigger the fallback) and verbatim remote failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, TLS, reset).
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Target URL.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// Request timed out.
    #[error("Request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// Authentication failed (401/403).
    #[error("Authentication failed (HTTP {status}): {body}")]
    AuthenticationFailed {
        /// HTTP status code.
        status: u16,
        /// Response body prefix.
        body: String,
    },

    /// The endpoint answered with something other than the expected payload.
    #[error("Service unavailable at {url}: {reason}")]
    Unavailable {
        /// URL that produced the signal.
        url: String,
        /// What was observed.
        reason: String,
    },

    /// Any other non-success response, surfaced verbatim.
    #[error("HTTP {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body prefix.
        body: String,
    },

    /// Response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration problem (missing API key, bad base URL).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] ohcloud_core::CoreError),
}

impl FetchError {
    /// Returns true for the "unavailable" signal.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns true for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns true if the remote service reported 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: 404, .. })
    }

    /// Returns true for missing credentials or invalid configuration.
    pub fn is_missing_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Core(ohcloud_core::CoreError::MissingCredentials(_))
        )
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout { url } => FetchError::Timeout { url },
            HttpError::Request { url, source } => FetchError::Transport {
                url,
                message: source.to_string(),
            },
            HttpError::InvalidUrl(msg) => FetchError::InvalidUrl(msg),
            HttpError::Build(msg) => FetchError::Config(msg),
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type raised by the host client.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error for {url}: {source}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// The client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns a lossy UTF-8 prefix of a response body for error messages.
pub fn body_prefix(body: &[u8]) -> String {
    let end = body.len().min(BODY_PREFIX_BYTES);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
