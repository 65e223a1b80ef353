//! Resource fetcher with a single secondary fallback.
//!
//! A fetch sends the request to the primary endpoint. If the response is the
//! "unavailable" signal and the locator carries a secondary endpoint for the
//! same resource, the request is sent once more to that endpoint with the
//! session key in place of the bearer token. There are never more than two
//! attempts per call.

use std::fmt;
use std::time::{Duration, Instant};

use ohcloud_core::Credentials;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::classify::{Payload, classify};
use crate::error::FetchError;
use crate::host::http::HttpClient;
use crate::locator::ResourceLocator;
use crate::request::ApiRequest;

/// Header carrying a runtime session key.
pub const SESSION_KEY_HEADER: &str = "X-Session-API-Key";

// ============================================================================
// Auth
// ============================================================================

/// Authentication attached to a request.
#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer <api key>`.
    Bearer(Credentials),
    /// `X-Session-API-Key: <key>`.
    SessionKey(String),
}

impl Auth {
    fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        match self {
            Self::Bearer(credentials) => {
                let value = HeaderValue::from_str(&credentials.bearer_header())
                    .map_err(|_| FetchError::Config("API key is not a valid header value".into()))?;
                headers.insert(AUTHORIZATION, value);
            }
            Self::SessionKey(key) => {
                let value = HeaderValue::from_str(key).map_err(|_| {
                    FetchError::Config("session key is not a valid header value".into())
                })?;
                headers.insert(SESSION_KEY_HEADER, value);
            }
        }
        Ok(headers)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(c) => f.debug_tuple("Bearer").field(c).finish(),
            Self::SessionKey(_) => f.debug_tuple("SessionKey").field(&"<redacted>").finish(),
        }
    }
}

// ============================================================================
// Fetch Attempt
// ============================================================================

/// Which endpoint an attempt was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The process-wide base URL.
    Primary,
    /// The resource-specific fallback.
    Secondary,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Record of a single attempt.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Endpoint the attempt targeted.
    pub endpoint: Endpoint,
    /// Full request URL.
    pub url: String,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error text if the attempt failed.
    pub error: Option<String>,
    /// How long the attempt took.
    pub duration: Duration,
}

// ============================================================================
// Fetch Outcome
// ============================================================================

/// The outcome of one fetch call.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The payload or the final error.
    pub result: Result<Payload, FetchError>,
    /// All attempts made (one or two).
    pub attempts: Vec<FetchAttempt>,
    /// Total duration.
    pub duration: Duration,
}

impl FetchOutcome {
    /// Returns true if the fetch succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the number of attempts made.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the endpoint that produced the payload, if any.
    pub fn served_by(&self) -> Option<Endpoint> {
        if self.result.is_err() {
            return None;
        }
        self.attempts.last().map(|a| a.endpoint)
    }

    /// Returns true if the secondary endpoint was contacted.
    pub fn used_fallback(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.endpoint == Endpoint::Secondary)
    }
}

// ============================================================================
// Resource Fetcher
// ============================================================================

/// Sends requests to a primary endpoint with a single documented fallback.
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    http: HttpClient,
    auth: Auth,
}

impl ResourceFetcher {
    /// Creates a fetcher authenticating with a bearer API key.
    pub fn new(http: HttpClient, credentials: Credentials) -> Self {
        Self {
            http,
            auth: Auth::Bearer(credentials),
        }
    }

    /// Creates a fetcher authenticating with a session key.
    pub fn with_session_key(http: HttpClient, key: impl Into<String>) -> Self {
        Self {
            http,
            auth: Auth::SessionKey(key.into()),
        }
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Fetches and returns the payload.
    pub async fn fetch(
        &self,
        locator: &ResourceLocator,
        request: &ApiRequest,
    ) -> Result<Payload, FetchError> {
        self.execute(locator, request).await.result
    }

    /// Fetches and returns the full outcome including attempt records.
    #[instrument(skip(self, locator, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute(&self, locator: &ResourceLocator, request: &ApiRequest) -> FetchOutcome {
        let start = Instant::now();
        let mut attempts = Vec::with_capacity(2);

        let primary = self
            .attempt(
                Endpoint::Primary,
                locator.primary_base(),
                request.path(),
                &self.auth,
                request,
                &mut attempts,
            )
            .await;

        let error = match primary {
            Ok(payload) => {
                return FetchOutcome {
                    result: Ok(payload),
                    attempts,
                    duration: start.elapsed(),
                };
            }
            Err(error) => error,
        };

        if !error.is_unavailable() {
            return FetchOutcome {
                result: Err(error),
                attempts,
                duration: start.elapsed(),
            };
        }

        let Some(secondary) = locator.secondary_for(request.resource_id()) else {
            debug!(error = %error, "Primary unavailable and no secondary endpoint known");
            return FetchOutcome {
                result: Err(error),
                attempts,
                duration: start.elapsed(),
            };
        };

        warn!(
            reason = %error,
            resource = secondary.resource_id(),
            secondary = secondary.base_url(),
            "Primary endpoint unavailable, falling back to secondary"
        );

        let auth = Auth::SessionKey(secondary.session_key().to_string());
        let result = self
            .attempt(
                Endpoint::Secondary,
                secondary.base_url(),
                request.fallback_path(),
                &auth,
                request,
                &mut attempts,
            )
            .await;

        FetchOutcome {
            result,
            attempts,
            duration: start.elapsed(),
        }
    }

    async fn attempt(
        &self,
        endpoint: Endpoint,
        base: &str,
        path: &str,
        auth: &Auth,
        request: &ApiRequest,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Result<Payload, FetchError> {
        let attempt_start = Instant::now();
        let url = HttpClient::build_url(base, path, request.query_pairs())?;
        let target = url.to_string();

        let mut status = None;
        let headers = auth.headers().map(|mut headers| {
            if let Some(accept) = request.accept_override() {
                headers.insert(ACCEPT, HeaderValue::from_static(accept));
            }
            headers
        });
        let result = match headers {
            Ok(headers) => match self
                .http
                .send(
                    request.method().clone(),
                    url,
                    headers,
                    request.body(),
                    request.timeout_override(),
                )
                .await
            {
                Ok(raw) => {
                    status = Some(raw.status.as_u16());
                    classify(&raw, request.expected_shape(), request.response_kind())
                }
                Err(e) => Err(FetchError::from(e)),
            },
            Err(e) => Err(e),
        };

        let duration = attempt_start.elapsed();
        match &result {
            Ok(_) => debug!(%endpoint, duration = ?duration, "Attempt succeeded"),
            Err(e) => debug!(%endpoint, error = %e, duration = ?duration, "Attempt failed"),
        }

        attempts.push(FetchAttempt {
            endpoint,
            url: target,
            status,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            duration,
        });

        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_headers() {
        let auth = Auth::Bearer(Credentials::new("sk-oh-test").unwrap());
        let headers = auth.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-oh-test");
        assert!(headers.get(SESSION_KEY_HEADER).is_none());
    }

    #[test]
    fn test_session_key_headers_replace_bearer() {
        let auth = Auth::SessionKey("sess-1".to_string());
        let headers = auth.headers().unwrap();
        assert_eq!(headers.get(SESSION_KEY_HEADER).unwrap(), "sess-1");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_auth_debug_redacts() {
        let auth = Auth::SessionKey("sess-secret".to_string());
        assert!(!format!("{auth:?}").contains("sess-secret"));
    }

    #[test]
    fn test_outcome_served_by() {
        let outcome = FetchOutcome {
            result: Ok(Payload::Json(serde_json::Value::Null)),
            attempts: vec![
                FetchAttempt {
                    endpoint: Endpoint::Primary,
                    url: "https://a/x".to_string(),
                    status: Some(200),
                    success: false,
                    error: Some("html".to_string()),
                    duration: Duration::ZERO,
                },
                FetchAttempt {
                    endpoint: Endpoint::Secondary,
                    url: "https://b/x".to_string(),
                    status: Some(200),
                    success: true,
                    error: None,
                    duration: Duration::ZERO,
                },
            ],
            duration: Duration::ZERO,
        };
        assert_eq!(outcome.served_by(), Some(Endpoint::Secondary));
        assert!(outcome.used_fallback());
        assert_eq!(outcome.attempts_count(), 2);
    }
}
