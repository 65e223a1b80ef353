//! Client configuration.
//!
//! The API key and base URL are read once from the environment at startup.
//! Reading goes through a lookup function so tests never touch the process
//! environment.

use std::time::Duration;

use ohcloud_core::{CoreError, Credentials};
use url::Url;

use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::host::http::{DEFAULT_TIMEOUT_SECS, HttpClient};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENHANDS_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "OPENHANDS_APP_BASE";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://app.all-hands.dev";

// ============================================================================
// Client Config
// ============================================================================

/// Credentials, base URL and timeout shared by every client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    credentials: Credentials,
    base_url: String,
    timeout: Duration,
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through a lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FetchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::builder().lookup(lookup).build()
    }

    /// Creates a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// API credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-call network timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds an HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<HttpClient, FetchError> {
        Ok(HttpClient::with_timeout(self.timeout)?)
    }

    /// Builds a bearer-authenticated fetcher.
    pub fn fetcher(&self) -> Result<ResourceFetcher, FetchError> {
        Ok(ResourceFetcher::new(
            self.http_client()?,
            self.credentials.clone(),
        ))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClientConfig`].
///
/// Explicit values win over values from the lookup.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    env_api_key: Option<String>,
    env_base_url: Option<String>,
}

impl ClientConfigBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls values from a lookup function (usually the environment).
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env_api_key = lookup(API_KEY_ENV);
        self.env_base_url = lookup(BASE_URL_ENV);
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the base URL if one is given.
    pub fn base_url_opt(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.base_url = url;
        }
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ClientConfig, FetchError> {
        let key = self.api_key.or(self.env_api_key).ok_or_else(|| {
            CoreError::MissingCredentials(format!("{API_KEY_ENV} is not set"))
        })?;
        let credentials = Credentials::new(key)?;

        let base_url = normalize_base_url(
            self.base_url
                .or(self.env_base_url)
                .filter(|u| !u.trim().is_empty())
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL),
        )?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(FetchError::Config("timeout must be positive".to_string()));
        }

        Ok(ClientConfig {
            credentials,
            base_url,
            timeout,
        })
    }
}

/// Trims whitespace and trailing slashes and checks the URL is absolute HTTP(S).
pub fn normalize_base_url(raw: &str) -> Result<String, FetchError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed =
        Url::parse(trimmed).map_err(|e| FetchError::Config(format!("invalid base URL {trimmed:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::Config(format!(
            "base URL must use http or https: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_lookup() {
        let config = ClientConfig::from_lookup(env(&[(API_KEY_ENV, "sk-oh-1")])).unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.credentials().expose(), "sk-oh-1");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig::from_lookup(env(&[
            (API_KEY_ENV, "k"),
            (BASE_URL_ENV, "https://staging.example.dev/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "https://staging.example.dev");
    }

    #[test]
    fn test_missing_key_is_reported() {
        let err = ClientConfig::from_lookup(env(&[])).unwrap_err();
        assert!(err.is_missing_config());

        let err = ClientConfig::from_lookup(env(&[(API_KEY_ENV, "   ")])).unwrap_err();
        assert!(err.is_missing_config());
    }

    #[test]
    fn test_explicit_values_override_lookup() {
        let config = ClientConfig::builder()
            .lookup(env(&[(API_KEY_ENV, "env-key"), (BASE_URL_ENV, "https://env.example")]))
            .base_url("https://cli.example")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "https://cli.example");
        assert_eq!(config.credentials().expose(), "env-key");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }
}
