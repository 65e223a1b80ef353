//! V1 app-server client (`/api/v1/...`).
//!
//! Event reads name their conversation as the resource; once the app
//! conversation has been fetched, its agent server is the fallback for them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use ohcloud_core::{AppConversation, SearchPage, StartTask};
use ohcloud_fetch::{
    ApiRequest, ClientConfig, HttpClient, Page, PageLimits, Paginated, Payload, PayloadShape,
    PollOutcome, PollSettings, ResourceFetcher, ResourceLocator, SecondaryEndpoint, paginate,
    poll,
};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::agent::AgentServerClient;
use crate::error::{ApiError, ApiResult};

/// Timeout for starting a conversation (provisions a sandbox).
pub const START_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for sandbox lifecycle calls and downloads.
pub const SANDBOX_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Request / Response Types
// ============================================================================

/// Parameters for [`AppServerClient::start_app_conversation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartConversation {
    /// First user message; the agent runs it immediately.
    pub initial_message: String,
    /// Repository (`owner/repo`).
    pub selected_repository: Option<String>,
    /// Branch.
    pub selected_branch: Option<String>,
    /// Title.
    pub title: Option<String>,
}

impl StartConversation {
    /// Creates a request with just the initial message.
    pub fn new(initial_message: impl Into<String>) -> Self {
        Self {
            initial_message: initial_message.into(),
            ..Self::default()
        }
    }

    /// Wire payload.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "initial_message".into(),
            json!({
                "role": "user",
                "content": [{"type": "text", "text": self.initial_message}],
                "run": true,
            }),
        );
        for (key, value) in [
            ("selected_repository", &self.selected_repository),
            ("selected_branch", &self.selected_branch),
            ("title", &self.title),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                body.insert(key.into(), json!(v));
            }
        }
        Value::Object(body)
    }
}

/// Downloaded trajectory archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryArchive {
    /// Archive bytes (zip).
    pub data: Vec<u8>,
    /// `Content-Type` reported by the server.
    pub content_type: Option<String>,
}

// ============================================================================
// App Server Client
// ============================================================================

/// Client for the V1 app server.
#[derive(Debug)]
pub struct AppServerClient {
    fetcher: ResourceFetcher,
    api_base: String,
    agents: Mutex<HashMap<String, SecondaryEndpoint>>,
}

impl AppServerClient {
    /// Creates a client from configuration.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        Ok(Self::with_fetcher(config.fetcher()?, config.base_url()))
    }

    /// Creates a client around an existing fetcher and app base URL.
    pub fn with_fetcher(fetcher: ResourceFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            api_base: format!("{}/api/v1", base_url.trim_end_matches('/')),
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// `{base}/api/v1`.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Agent-server endpoint discovered for a conversation, if any.
    pub fn agent_endpoint(&self, conversation_id: &str) -> Option<SecondaryEndpoint> {
        self.agents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(conversation_id)
            .cloned()
    }

    fn remember_agent(&self, conversation: &AppConversation) {
        if let Some(endpoint) = SecondaryEndpoint::from_app_conversation(conversation) {
            debug!(conversation = %conversation.id, agent = endpoint.base_url(), "Agent server discovered");
            self.agents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(conversation.id.clone())
                .or_insert(endpoint);
        }
    }

    async fn payload(&self, request: ApiRequest) -> ApiResult<Payload> {
        let secondary = request
            .resource_id()
            .and_then(|id| self.agent_endpoint(id));
        let locator = ResourceLocator::primary(&self.api_base).with_secondary_opt(secondary);
        Ok(self.fetcher.fetch(&locator, &request).await?)
    }

    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        Ok(self.payload(request).await?.into_json()?)
    }

    async fn send_as<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        Ok(serde_json::from_value(self.send(request).await?)?)
    }

    // ========================================================================
    // App Conversations
    // ========================================================================

    /// One page of app conversations.
    pub async fn search_app_conversations(
        &self,
        limit: u32,
        page_id: Option<&str>,
    ) -> ApiResult<SearchPage<AppConversation>> {
        let request = ApiRequest::get("/app-conversations/search")
            .query("limit", limit.max(1))
            .query_opt("page_id", page_id)
            .expect(PayloadShape::ObjectWithKey("items"));
        self.send_as(request).await
    }

    /// All app conversations within `limits`.
    #[instrument(skip(self))]
    pub async fn search_all_app_conversations(
        &self,
        page_size: u32,
        limits: PageLimits,
    ) -> ApiResult<Paginated<AppConversation>> {
        paginate(limits, None, |token| async move {
            let page = self
                .search_app_conversations(page_size, token.as_deref())
                .await?;
            Ok::<_, ApiError>(Page::new(page.items, page.next_page_id))
        })
        .await
    }

    /// One app conversation, via the batch endpoint.
    #[instrument(skip(self))]
    pub async fn get_app_conversation(&self, conversation_id: &str) -> ApiResult<AppConversation> {
        let request = ApiRequest::get("/app-conversations")
            .query("ids", conversation_id)
            .expect(PayloadShape::Array);
        let found: Vec<Option<AppConversation>> = self.send_as(request).await?;
        let conversation = found
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| ApiError::NotFound {
                kind: "app conversation",
                id: conversation_id.to_string(),
            })?;
        self.remember_agent(&conversation);
        Ok(conversation)
    }

    /// Number of app conversations.
    pub async fn count_app_conversations(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/app-conversations/count")).await
    }

    /// Starts a conversation; returns the start task.
    #[instrument(skip(self, params))]
    pub async fn start_app_conversation(&self, params: &StartConversation) -> ApiResult<StartTask> {
        let request = ApiRequest::post("/app-conversations")
            .json_value(params.payload())
            .timeout(START_TIMEOUT)
            .expect(PayloadShape::Object);
        let task: StartTask = self.send_as(request).await?;
        info!(task = %task.id, status = %task.status, "Start task created");
        Ok(task)
    }

    /// One start task.
    pub async fn get_start_task(&self, task_id: &str) -> ApiResult<StartTask> {
        let request = ApiRequest::get("/app-conversations/start-tasks")
            .query("ids", task_id)
            .expect(PayloadShape::Array);
        let found: Vec<Option<StartTask>> = self.send_as(request).await?;
        found
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| ApiError::NotFound {
                kind: "start task",
                id: task_id.to_string(),
            })
    }

    /// Polls a start task until it is `READY` or `ERROR`.
    pub async fn wait_for_start_task(
        &self,
        task_id: &str,
        settings: PollSettings,
    ) -> ApiResult<PollOutcome<StartTask>> {
        let outcome = poll(
            settings,
            || self.get_start_task(task_id),
            |task| task.status.is_terminal(),
        )
        .await?;
        info!(
            task = task_id,
            attempts = outcome.attempts,
            status = %outcome.last.status,
            end = ?outcome.end,
            "Start task polling finished"
        );
        Ok(outcome)
    }

    /// Downloads the trajectory archive.
    pub async fn download_trajectory(&self, conversation_id: &str) -> ApiResult<TrajectoryArchive> {
        let request = ApiRequest::get(format!("/app-conversations/{conversation_id}/download"))
            .bytes()
            .timeout(SANDBOX_TIMEOUT);
        match self.payload(request).await? {
            Payload::Bytes { data, content_type } => Ok(TrajectoryArchive { data, content_type }),
            Payload::Json(v) => Ok(TrajectoryArchive {
                data: serde_json::to_vec(&v)?,
                content_type: Some("application/json".to_string()),
            }),
        }
    }

    // ========================================================================
    // Sandboxes
    // ========================================================================

    /// One page of sandboxes.
    pub async fn search_sandboxes(&self, limit: u32) -> ApiResult<Value> {
        self.send(ApiRequest::get("/sandboxes/search").query("limit", limit.max(1)))
            .await
    }

    /// One page of sandbox specs.
    pub async fn search_sandbox_specs(&self, limit: u32) -> ApiResult<Value> {
        self.send(ApiRequest::get("/sandbox-specs/search").query("limit", limit.max(1)))
            .await
    }

    /// Resumes a paused sandbox.
    pub async fn resume_sandbox(&self, sandbox_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::post(format!("/sandboxes/{sandbox_id}/resume")).timeout(SANDBOX_TIMEOUT))
            .await
    }

    /// Pauses a running sandbox.
    pub async fn pause_sandbox(&self, sandbox_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::post(format!("/sandboxes/{sandbox_id}/pause")).timeout(SANDBOX_TIMEOUT))
            .await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Searches events. Falls back to the agent server.
    pub async fn search_events(&self, conversation_id: &str, limit: u32) -> ApiResult<Value> {
        let request = ApiRequest::get(format!("/conversation/{conversation_id}/events/search"))
            .query("limit", limit.max(1))
            .resource(conversation_id)
            .secondary_path(format!("/api/conversations/{conversation_id}/events/search"))
            .expect(PayloadShape::ObjectWithKey("items"));
        self.send(request).await
    }

    /// Counts events. Falls back to the agent server.
    pub async fn count_events(&self, conversation_id: &str) -> ApiResult<Value> {
        let request = ApiRequest::get(format!("/conversation/{conversation_id}/events/count"))
            .resource(conversation_id)
            .secondary_path(format!("/api/conversations/{conversation_id}/events/count"));
        self.send(request).await
    }

    // ========================================================================
    // Users / Agent Server
    // ========================================================================

    /// Authenticated user.
    pub async fn get_current_user(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/users/me")).await
    }

    /// Fetches the app conversation and returns its agent-server endpoint.
    pub async fn agent_locator(&self, conversation_id: &str) -> ApiResult<SecondaryEndpoint> {
        if let Some(endpoint) = self.agent_endpoint(conversation_id) {
            return Ok(endpoint);
        }
        let conversation = self.get_app_conversation(conversation_id).await?;
        SecondaryEndpoint::from_app_conversation(&conversation)
            .ok_or_else(|| ApiError::MissingRuntime(conversation_id.to_string()))
    }

    /// Client for the conversation's agent server.
    pub async fn agent_client(&self, conversation_id: &str) -> ApiResult<AgentServerClient> {
        let endpoint = self.agent_locator(conversation_id).await?;
        Ok(AgentServerClient::from_endpoint(
            self.fetcher.http().clone(),
            &endpoint,
        ))
    }

    /// HTTP client shared with agent-server clients.
    pub fn http(&self) -> &HttpClient {
        self.fetcher.http()
    }
}
