//! Resource locators: where a request can be sent.
//!
//! The primary base URL is fixed for the process. A secondary endpoint only
//! exists after the resource's parent record has been fetched, and it is
//! bound to the resource it was derived from.

use std::fmt;

use ohcloud_core::{AppConversation, ConversationDetails};

// ============================================================================
// Secondary Endpoint
// ============================================================================

/// Resource-specific fallback host and session key.
#[derive(Clone, PartialEq, Eq)]
pub struct SecondaryEndpoint {
    resource_id: String,
    base_url: String,
    session_key: String,
}

impl SecondaryEndpoint {
    /// Creates a secondary endpoint for a resource.
    pub fn new(
        resource_id: impl Into<String>,
        base_url: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_key: session_key.into(),
        }
    }

    /// Derives the runtime endpoint of a V0 conversation.
    ///
    /// Returns `None` while the runtime is not running.
    pub fn from_conversation(details: &ConversationDetails) -> Option<Self> {
        let (url, key) = details.runtime_access()?;
        Some(Self::new(details.conversation_id.clone(), url, key))
    }

    /// Derives the agent-server endpoint of a V1 app conversation.
    pub fn from_app_conversation(conversation: &AppConversation) -> Option<Self> {
        let (base, key) = conversation.agent_server_access()?;
        Some(Self::new(conversation.id.clone(), base, key))
    }

    /// Resource this endpoint was derived for.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Base URL of the secondary host.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session key used in place of the bearer token.
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Returns true if this endpoint may serve the given resource.
    pub fn serves(&self, resource: Option<&str>) -> bool {
        resource.is_some_and(|id| id == self.resource_id)
    }
}

impl fmt::Debug for SecondaryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryEndpoint")
            .field("resource_id", &self.resource_id)
            .field("base_url", &self.base_url)
            .field("session_key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Resource Locator
// ============================================================================

/// Where to send a request: a primary base URL and an optional fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    primary: String,
    secondary: Option<SecondaryEndpoint>,
}

impl ResourceLocator {
    /// Creates a locator with only a primary endpoint.
    pub fn primary(base_url: impl Into<String>) -> Self {
        Self {
            primary: base_url.into().trim_end_matches('/').to_string(),
            secondary: None,
        }
    }

    /// Attaches a secondary endpoint.
    pub fn with_secondary(mut self, secondary: SecondaryEndpoint) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Attaches a secondary endpoint if one is known.
    pub fn with_secondary_opt(mut self, secondary: Option<SecondaryEndpoint>) -> Self {
        self.secondary = secondary;
        self
    }

    /// Primary base URL.
    pub fn primary_base(&self) -> &str {
        &self.primary
    }

    /// Secondary endpoint, regardless of resource.
    pub fn secondary(&self) -> Option<&SecondaryEndpoint> {
        self.secondary.as_ref()
    }

    /// Secondary endpoint usable for the given resource.
    pub fn secondary_for(&self, resource: Option<&str>) -> Option<&SecondaryEndpoint> {
        self.secondary.as_ref().filter(|s| s.serves(resource))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_bound_to_resource() {
        let locator = ResourceLocator::primary("https://app.example/")
            .with_secondary(SecondaryEndpoint::new("conv-a", "https://rt.example/", "key"));

        assert_eq!(locator.primary_base(), "https://app.example");
        assert!(locator.secondary_for(Some("conv-a")).is_some());
        assert!(locator.secondary_for(Some("conv-b")).is_none());
        assert!(locator.secondary_for(None).is_none());
        assert_eq!(
            locator.secondary().map(SecondaryEndpoint::base_url),
            Some("https://rt.example")
        );
    }

    #[test]
    fn test_from_conversation_requires_runtime() {
        let mut details = ConversationDetails {
            conversation_id: "conv-a".to_string(),
            ..Default::default()
        };
        assert!(SecondaryEndpoint::from_conversation(&details).is_none());

        details.url = Some("https://rt.example/conv-a".to_string());
        details.session_api_key = Some("sess".to_string());
        let secondary = SecondaryEndpoint::from_conversation(&details).unwrap();
        assert_eq!(secondary.resource_id(), "conv-a");
        assert_eq!(secondary.session_key(), "sess");
    }

    #[test]
    fn test_debug_redacts_session_key() {
        let secondary = SecondaryEndpoint::new("c", "https://rt.example", "very-secret");
        assert!(!format!("{secondary:?}").contains("very-secret"));
    }
}
