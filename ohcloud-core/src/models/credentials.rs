//! Bearer token handling.

use std::fmt;

use crate::error::CoreError;

/// Opaque bearer token attached to every primary request.
///
/// The token is supplied once per process and never changes afterwards.
/// `Debug` output is redacted so the value cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// Creates credentials from a raw token.
    ///
    /// Surrounding whitespace is trimmed; an empty token is rejected.
    pub fn new(token: impl Into<String>) -> Result<Self, CoreError> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CoreError::MissingCredentials(
                "API key is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the `Authorization` header value.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Returns a masked form suitable for display (`abcdefghij...wxyz`).
    ///
    /// Short tokens are fully masked.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 16 {
            return "****".to_string();
        }
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

// ============================================================================
// Tests
// ============================================================================
