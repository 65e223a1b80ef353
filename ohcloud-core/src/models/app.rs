//! V1 app-server types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Path segment that separates the agent-server base from a conversation URL.
const AGENT_CONVERSATIONS_SEGMENT: &str = "/api/conversations";

// ============================================================================
// Search Page
// ============================================================================

/// List envelope used by V1 search endpoints (`items` + `next_page_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    /// Items in this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    /// Continuation token for the next page.
    #[serde(default)]
    pub next_page_id: Option<String>,
}

// ============================================================================
// App Conversation
// ============================================================================

/// Conversation record returned by the V1 app server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConversation {
    /// Conversation ID.
    #[serde(default)]
    pub id: String,

    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Sandbox hosting the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<String>,

    /// Sandbox status (e.g. `RUNNING`, `PAUSED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_status: Option<String>,

    /// Agent execution status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,

    /// Conversation URL on the agent server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_url: Option<String>,

    /// Session key for the agent server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_api_key: Option<String>,

    /// Repository in `owner/repo` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repository: Option<String>,

    /// Selected git branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_branch: Option<String>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Every other field returned by the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConversation {
    /// Returns the agent-server base URL and session key when both are known.
    ///
    /// The base is `conversation_url` with everything from
    /// `/api/conversations` onwards removed.
    pub fn agent_server_access(&self) -> Option<(String, &str)> {
        let url = self
            .conversation_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        let key = self
            .session_api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;

        let base = match url.find(AGENT_CONVERSATIONS_SEGMENT) {
            Some(idx) => &url[..idx],
            None => url,
        };
        Some((base.trim_end_matches('/').to_string(), key))
    }
}

// ============================================================================
// Start Task
// ============================================================================

/// Status of an asynchronous conversation start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StartTaskStatus {
    /// Conversation is ready; `app_conversation_id` is populated.
    Ready,
    /// Start failed.
    Error,
    /// Any intermediate step (`WORKING`, `WAITING_FOR_SANDBOX`, ...).
    InProgress(String),
}

impl StartTaskStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::InProgress(s) => s,
        }
    }

    /// Returns true once the task will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl From<String> for StartTaskStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "READY" => Self::Ready,
            "ERROR" => Self::Error,
            _ => Self::InProgress(raw.trim().to_string()),
        }
    }
}

impl From<StartTaskStatus> for String {
    fn from(status: StartTaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StartTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the asynchronous creation of an app conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTask {
    /// Task ID.
    pub id: String,

    /// Current status.
    pub status: StartTaskStatus,

    /// Conversation ID, populated once the task is `READY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_conversation_id: Option<String>,

    /// Human-readable progress or error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Every other field returned by the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================
