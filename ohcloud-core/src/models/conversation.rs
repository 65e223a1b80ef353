//! V0 conversation types.
//!
//! - [`ConversationDetails`] - Conversation record from `/api/conversations/{id}`
//! - [`ConversationStatus`] - Lifecycle status
//! - [`ConversationSummary`] - Derived overview

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Conversation Status
// ============================================================================

/// Conversation lifecycle status.
///
/// Parsed case-insensitively. Values this crate does not know are kept
/// verbatim in [`ConversationStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationStatus {
    /// Runtime is being provisioned.
    Starting,
    /// Agent loop is running.
    Running,
    /// Conversation stopped normally.
    Stopped,
    /// Conversation was archived.
    Archived,
    /// Conversation failed.
    Failed,
    /// Conversation ended in an error state.
    Error,
    /// Conversation was cancelled.
    Cancelled,
    /// Any other status string.
    Other(String),
}

impl ConversationStatus {
    /// Parses a raw status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "STOPPED" => Self::Stopped,
            "ARCHIVED" => Self::Archived,
            "FAILED" => Self::Failed,
            "ERROR" => Self::Error,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Archived => "ARCHIVED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }

    /// Returns true when the conversation will not make further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stopped | Self::Failed | Self::Error | Self::Cancelled
        )
    }

    /// Returns true for terminal statuses other than a clean stop.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Cancelled)
    }
}

impl From<String> for ConversationStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ConversationStatus> for String {
    fn from(status: ConversationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversation Details
// ============================================================================

/// Conversation record returned by the V0 API.
///
/// `url` and `session_api_key` are only present while the runtime is up;
/// together they form the runtime fallback for this conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetails {
    /// Conversation ID.
    #[serde(default)]
    pub conversation_id: String,

    /// Conversation title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,

    /// Runtime status string (e.g. `STATUS$READY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_status: Option<String>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,

    /// Repository in `owner/repo` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repository: Option<String>,

    /// Selected git branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_branch: Option<String>,

    /// Runtime URL for direct access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Session key for the runtime URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_api_key: Option<String>,

    /// Every other field returned by the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationDetails {
    /// Returns the runtime URL and session key when both are non-empty.
    pub fn runtime_access(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self
            .session_api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((url, key))
    }

    /// Returns true if the runtime can be reached directly.
    pub fn has_runtime(&self) -> bool {
        self.runtime_access().is_some()
    }
}

// ============================================================================
// Conversation Summary
// ============================================================================

/// Maximum length of the first user message kept in a summary.
pub const FIRST_MESSAGE_PREVIEW_CHARS: usize = 200;

/// Overview of a conversation built from its details and a few event windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID.
    pub conversation_id: String,
    /// Title.
    pub title: Option<String>,
    /// Lifecycle status.
    pub status: Option<ConversationStatus>,
    /// Runtime status.
    pub runtime_status: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub last_updated_at: Option<String>,
    /// Repository.
    pub repository: Option<String>,
    /// Branch.
    pub branch: Option<String>,
    /// Number of events (latest event id + 1).
    pub event_count: u64,
    /// Most recently referenced model.
    pub model: Option<String>,
    /// First user message, truncated to [`FIRST_MESSAGE_PREVIEW_CHARS`].
    pub first_message: Option<String>,
    /// Runtime URL.
    pub url: Option<String>,
    /// Whether the runtime is reachable directly.
    pub has_runtime: bool,
}

impl ConversationSummary {
    /// Builds a summary from details and event insights.
    pub fn build(
        details: &ConversationDetails,
        last_event_id: Option<u64>,
        model: Option<String>,
        first_message: Option<&str>,
    ) -> Self {
        Self {
            conversation_id: details.conversation_id.clone(),
            title: details.title.clone(),
            status: details.status.clone(),
            runtime_status: details.runtime_status.clone(),
            created_at: details.created_at.clone(),
            last_updated_at: details.last_updated_at.clone(),
            repository: details.selected_repository.clone(),
            branch: details.selected_branch.clone(),
            event_count: last_event_id.map_or(0, |id| id + 1),
            model,
            first_message: first_message
                .map(|m| m.chars().take(FIRST_MESSAGE_PREVIEW_CHARS).collect()),
            url: details.url.clone(),
            has_runtime: details.has_runtime(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
