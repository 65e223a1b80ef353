//! Request description passed to the fetcher.
//!
//! An [`ApiRequest`] is endpoint-independent: it names a path relative to a
//! base URL, so the same request can be sent to the primary host and, if
//! needed, to the resource's secondary host.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Payload Shape
// ============================================================================

/// The structure a successful JSON response must have.
///
/// A response that parses as JSON but does not match the expected shape is
/// treated like an HTML page: the service is not answering the way this
/// resource answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PayloadShape {
    /// Any JSON value, including `null` for an empty body.
    #[default]
    Any,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// A JSON object containing the given key.
    ObjectWithKey(&'static str),
}

impl PayloadShape {
    /// Returns true if the value has this shape.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::ObjectWithKey(key) => value.get(*key).is_some(),
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any JSON"),
            Self::Object => f.write_str("a JSON object"),
            Self::Array => f.write_str("a JSON array"),
            Self::ObjectWithKey(key) => write!(f, "a JSON object with `{key}`"),
        }
    }
}

// ============================================================================
// Response Kind / Body
// ============================================================================

/// How the response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// Parse as JSON and check the [`PayloadShape`].
    #[default]
    Json,
    /// Keep raw bytes (file downloads, zip archives).
    Bytes,
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// JSON body.
    Json(Value),
    /// Single-file multipart upload.
    Multipart {
        /// Form field name.
        field: String,
        /// File name sent with the part.
        file_name: String,
        /// MIME type of the part.
        mime: String,
        /// File content.
        content: Vec<u8>,
    },
}

// ============================================================================
// Api Request
// ============================================================================

/// A fully-formed request, independent of the endpoint it is sent to.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    secondary_path: Option<String>,
    query: Vec<(String, String)>,
    body: RequestBody,
    resource: Option<String>,
    expect: PayloadShape,
    response: ResponseKind,
    timeout: Option<Duration>,
    accept: Option<&'static str>,
}

impl ApiRequest {
    /// Creates a request with the given method and primary path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: normalize_path(path.into()),
            secondary_path: None,
            query: Vec::new(),
            body: RequestBody::Empty,
            resource: None,
            expect: PayloadShape::Any,
            response: ResponseKind::Json,
            timeout: None,
            accept: None,
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Creates a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds a query parameter when the value is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets a JSON body from an already-built value.
    pub fn json_value(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets a single-file multipart body.
    pub fn multipart(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            content,
        };
        self
    }

    /// Names the resource this request targets.
    ///
    /// Only a secondary endpoint derived for the same resource will be used
    /// as a fallback.
    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.resource = Some(id.into());
        self
    }

    /// Sets the path used on the secondary endpoint.
    pub fn secondary_path(mut self, path: impl Into<String>) -> Self {
        self.secondary_path = Some(normalize_path(path.into()));
        self
    }

    /// Sets the expected payload shape.
    pub fn expect(mut self, shape: PayloadShape) -> Self {
        self.expect = shape;
        self
    }

    /// Keeps the response as raw bytes.
    pub fn bytes(mut self) -> Self {
        self.response = ResponseKind::Bytes;
        self
    }

    /// Overrides the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the default `Accept: application/json` media type.
    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path on the primary endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path on the secondary endpoint (defaults to the primary path).
    pub fn fallback_path(&self) -> &str {
        self.secondary_path.as_deref().unwrap_or(&self.path)
    }

    /// Query parameters.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Resource id, if named.
    pub fn resource_id(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Expected payload shape.
    pub fn expected_shape(&self) -> &PayloadShape {
        &self.expect
    }

    /// Response kind.
    pub fn response_kind(&self) -> ResponseKind {
        self.response
    }

    /// Per-call timeout override.
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// `Accept` media type override.
    pub fn accept_override(&self) -> Option<&'static str> {
        self.accept
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

// ============================================================================
// Tests
// ============================================================================
