//! HTTP client with tracing and per-call timeouts.
//!
//! This module wraps a reqwest client and reduces every exchange to a
//! [`RawResponse`]: status, content type and the full body. Interpreting the
//! body is left to [`crate::classify`].

use reqwest::{Client, Method, StatusCode, header::HeaderMap, multipart};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;
use crate::request::RequestBody;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for ohcloud.
const USER_AGENT: &str = concat!("ohcloud/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Raw Response
// ============================================================================

/// A response read to completion.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL.
    pub url: String,
    /// HTTP status.
    pub status: StatusCode,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// Full body.
    pub body: Vec<u8>,
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self { inner, timeout })
    }

    /// Default per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins a base URL, a path and query parameters into a request URL.
    pub fn build_url(
        base: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url, HttpError> {
        let raw = format!("{}{}", base.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| HttpError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends a request and reads the response body.
    ///
    /// Non-success statuses are returned as responses, not errors. Only
    /// transport failures and timeouts produce an [`HttpError`].
    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: &RequestBody,
        timeout: Option<Duration>,
    ) -> Result<RawResponse, HttpError> {
        let target = url.to_string();
        debug!(%method, "Sending request");

        let mut builder = self
            .inner
            .request(method, url)
            .headers(headers)
            .timeout(timeout.unwrap_or(self.timeout));

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart {
                field,
                file_name,
                mime,
                content,
            } => {
                let part = multipart::Part::bytes(content.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| HttpError::Build(e.to_string()))?;
                builder.multipart(multipart::Form::new().part(field.clone(), part))
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| request_error(&target, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(&target, e))?
            .to_vec();

        debug!(%status, bytes = body.len(), "Response received");

        Ok(RawResponse {
            url: target,
            status,
            content_type,
            body,
        })
    }
}

fn request_error(url: &str, source: reqwest::Error) -> HttpError {
    if source.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else {
        HttpError::Request {
            url: url.to_string(),
            source,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_and_encodes() {
        let url = HttpClient::build_url(
            "https://app.example/",
            "/api/conversations",
            &[("page_id".to_string(), "a b".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://app.example/api/conversations?page_id=a+b"
        );
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(HttpClient::build_url("not a url", "/x", &[]).is_err());
    }

    #[test]
    fn test_client_builds() {
        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
