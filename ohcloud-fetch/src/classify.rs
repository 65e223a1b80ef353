//! Response classification.
//!
//! [`unavailable_signal`] is the one place that decides whether a response
//! means "this endpoint is not serving the resource right now". It is a
//! heuristic over what the service returns during maintenance windows
//! (HTML error pages, 503s, gateway pages) and is the only signal that can
//! trigger a fallback.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{FetchError, body_prefix};
use crate::host::http::RawResponse;
use crate::request::{PayloadShape, ResponseKind};

// ============================================================================
// Payload
// ============================================================================

/// A successfully classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON (`null` for an empty body).
    Json(Value),
    /// Raw bytes.
    Bytes {
        /// Body.
        data: Vec<u8>,
        /// `Content-Type` header, if any.
        content_type: Option<String>,
    },
}

impl Payload {
    /// Returns the JSON value, if this is a JSON payload.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Bytes { .. } => None,
        }
    }

    /// Converts into a JSON value.
    pub fn into_json(self) -> Result<Value, FetchError> {
        match self {
            Self::Json(v) => Ok(v),
            Self::Bytes { .. } => Err(FetchError::InvalidResponse(
                "expected JSON, got raw bytes".to_string(),
            )),
        }
    }
}

// ============================================================================
// Unavailable Signal
// ============================================================================

/// Returns a reason string when the response is the "unavailable" signal.
///
/// - an HTML document (by `Content-Type` or by body) where data was expected
/// - `503 Service Unavailable`
/// - `502`/`504` gateway errors that do not carry a JSON body
pub fn unavailable_signal(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
) -> Option<String> {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return Some(format!("HTTP {} with an HTML page", status.as_u16()));
    }

    if looks_like_html(body) {
        return Some(format!("HTTP {} with an HTML body", status.as_u16()));
    }

    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Some("HTTP 503 service unavailable".to_string());
    }

    if matches!(status, StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT)
        && serde_json::from_slice::<Value>(body).is_err()
    {
        return Some(format!("HTTP {} gateway error", status.as_u16()));
    }

    None
}

fn looks_like_html(body: &[u8]) -> bool {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..body.len().min(start + 64)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.starts_with("<head")
}

// ============================================================================
// Classification
// ============================================================================

/// Classifies a raw response into a payload or a [`FetchError`].
pub fn classify(
    response: &RawResponse,
    expect: &PayloadShape,
    kind: ResponseKind,
) -> Result<Payload, FetchError> {
    let status = response.status;

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(FetchError::AuthenticationFailed {
            status: status.as_u16(),
            body: body_prefix(&response.body),
        });
    }

    if let Some(reason) =
        unavailable_signal(status, response.content_type.as_deref(), &response.body)
    {
        return Err(FetchError::Unavailable {
            url: response.url.clone(),
            reason,
        });
    }

    if !status.is_success() {
        return Err(FetchError::Remote {
            status: status.as_u16(),
            body: body_prefix(&response.body),
        });
    }

    match kind {
        ResponseKind::Bytes => Ok(Payload::Bytes {
            data: response.body.clone(),
            content_type: response.content_type.clone(),
        }),
        ResponseKind::Json => {
            let value = parse_json_body(response)?;
            if !expect.matches(&value) {
                return Err(FetchError::Unavailable {
                    url: response.url.clone(),
                    reason: format!("unexpected payload shape, expected {expect}"),
                });
            }
            Ok(Payload::Json(value))
        }
    }
}

fn parse_json_body(response: &RawResponse) -> Result<Value, FetchError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|_| FetchError::Unavailable {
        url: response.url.clone(),
        reason: format!(
            "non-JSON response (content-type={:?}, body_prefix={:?})",
            response.content_type.as_deref().unwrap_or(""),
            body_prefix(&response.body)
        ),
    })
}

// ============================================================================
// Tests
// ============================================================================
