//! V0 Cloud API client (`/api/...`).
//!
//! Conversation reads that have a runtime equivalent (`/events`,
//! `/trajectory`) name their conversation as the resource, so once
//! [`CloudClient::get_conversation`] has seen a running runtime, those reads
//! fall back to it when the app host is unavailable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use ohcloud_core::{
    ConversationDetails, ConversationSummary, Credentials, EventPage, ResultSet, event_id,
};
use ohcloud_fetch::{
    ApiRequest, ClientConfig, FetchError, Page, PageLimits, Paginated, PayloadShape, PollOutcome,
    PollSettings, ResourceFetcher, ResourceLocator, SecondaryEndpoint, paginate, poll,
};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::error::{ApiError, ApiResult};
use crate::insights;

/// Largest page the events and list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default number of events per `get_events` call.
pub const DEFAULT_EVENT_LIMIT: u32 = 20;

/// Size of the event windows used for insights.
const INSIGHT_WINDOW: u32 = 20;

/// Common tail appended to prompt files when it exists.
pub const DEFAULT_COMMON_TAIL_PATH: &str = "scripts/prompts/common_tail.j2";

/// GitHub REST API base.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Media type requested from the GitHub REST API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

// ============================================================================
// Event Query
// ============================================================================

/// Parameters of a `/events` read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    /// First event id (inclusive).
    pub start_id: u64,
    /// Last event id, if bounded.
    pub end_id: Option<u64>,
    /// Newest first.
    pub reverse: bool,
    /// Page size, clamped to 1..=100 when sent.
    pub limit: u32,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            start_id: 0,
            end_id: None,
            reverse: false,
            limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

impl EventQuery {
    /// The newest `limit` events.
    pub fn latest(limit: u32) -> Self {
        Self {
            reverse: true,
            limit,
            ..Self::default()
        }
    }

    /// Up to `limit` events starting at `start_id`.
    pub fn from_id(start_id: u64, limit: u32) -> Self {
        Self {
            start_id,
            limit,
            ..Self::default()
        }
    }

    /// Limit actually sent to the service.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

// ============================================================================
// Cloud Client
// ============================================================================

/// Client for the V0 `/api` surface.
#[derive(Debug)]
pub struct CloudClient {
    fetcher: ResourceFetcher,
    base_url: String,
    github_api: String,
    runtimes: Mutex<HashMap<String, SecondaryEndpoint>>,
}

impl CloudClient {
    /// Creates a client from configuration.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        Ok(Self::with_fetcher(config.fetcher()?, config.base_url()))
    }

    /// Creates a client around an existing fetcher.
    pub fn with_fetcher(fetcher: ResourceFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            github_api: GITHUB_API_BASE.to_string(),
            runtimes: Mutex::new(HashMap::new()),
        }
    }

    /// Points GitHub calls at another API base (e.g. GitHub Enterprise).
    pub fn with_github_api_base(mut self, base: impl Into<String>) -> Self {
        self.github_api = base.into().trim_end_matches('/').to_string();
        self
    }

    /// App base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Runtime endpoint discovered for a conversation, if any.
    pub fn runtime_endpoint(&self, conversation_id: &str) -> Option<SecondaryEndpoint> {
        self.runtimes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(conversation_id)
            .cloned()
    }

    fn remember_runtime(&self, details: &ConversationDetails) {
        if let Some(endpoint) = SecondaryEndpoint::from_conversation(details) {
            debug!(conversation = %details.conversation_id, runtime = endpoint.base_url(), "Runtime endpoint discovered");
            self.runtimes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(details.conversation_id.clone())
                .or_insert(endpoint);
        }
    }

    fn locator(&self, conversation_id: Option<&str>) -> ResourceLocator {
        ResourceLocator::primary(&self.base_url)
            .with_secondary_opt(conversation_id.and_then(|id| self.runtime_endpoint(id)))
    }

    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let locator = self.locator(request.resource_id());
        Ok(self.fetcher.fetch(&locator, &request).await?.into_json()?)
    }

    async fn send_as<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        Ok(serde_json::from_value(self.send(request).await?)?)
    }

    // ========================================================================
    // Conversations
    // ========================================================================

    /// Lists conversations, following `next_page_id` within `limits`.
    #[instrument(skip(self))]
    pub async fn list_conversations(
        &self,
        page_size: u32,
        limits: PageLimits,
    ) -> ApiResult<Paginated<ConversationDetails>> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        paginate(limits, None, |token| async move {
            let request = ApiRequest::get("/api/conversations")
                .query("limit", page_size)
                .query_opt("page_id", token)
                .expect(PayloadShape::ObjectWithKey("results"));
            let page: ResultSet<ConversationDetails> = self.send_as(request).await?;
            Ok::<_, ApiError>(Page::new(page.results, page.next_page_id))
        })
        .await
    }

    /// Fetches a conversation and remembers its runtime endpoint.
    pub async fn get_conversation(&self, conversation_id: &str) -> ApiResult<ConversationDetails> {
        Ok(self.get_conversation_record(conversation_id).await?.1)
    }

    /// Fetches a conversation, returning the record exactly as received
    /// alongside its typed view. The runtime endpoint is remembered.
    #[instrument(skip(self))]
    pub async fn get_conversation_record(
        &self,
        conversation_id: &str,
    ) -> ApiResult<(Value, ConversationDetails)> {
        let request = ApiRequest::get(format!("/api/conversations/{conversation_id}"))
            .expect(PayloadShape::Object);
        let raw = self.send(request).await?;
        let mut details: ConversationDetails = serde_json::from_value(raw.clone())?;
        if details.conversation_id.is_empty() {
            details.conversation_id = conversation_id.to_string();
        }
        self.remember_runtime(&details);
        Ok((raw, details))
    }

    /// Fetches the conversation so its runtime can serve as a fallback.
    ///
    /// Returns whether a runtime endpoint is known afterwards.
    pub async fn discover_runtime(&self, conversation_id: &str) -> ApiResult<bool> {
        if self.runtime_endpoint(conversation_id).is_some() {
            return Ok(true);
        }
        let details = self.get_conversation(conversation_id).await?;
        Ok(details.has_runtime())
    }

    /// Creates a conversation.
    #[instrument(skip(self, initial_user_msg))]
    pub async fn create_conversation(
        &self,
        initial_user_msg: &str,
        repository: Option<&str>,
        selected_branch: Option<&str>,
    ) -> ApiResult<Value> {
        let mut body = Map::new();
        body.insert("initial_user_msg".into(), json!(initial_user_msg));
        if let Some(repo) = repository.filter(|r| !r.is_empty()) {
            body.insert("repository".into(), json!(repo));
        }
        if let Some(branch) = selected_branch.filter(|b| !b.is_empty()) {
            body.insert("selected_branch".into(), json!(branch));
        }
        self.send(ApiRequest::post("/api/conversations").json_value(Value::Object(body)))
            .await
    }

    /// Creates a conversation from a prompt file, appending the common tail
    /// file when it exists.
    pub async fn create_conversation_from_files(
        &self,
        prompt_path: &Path,
        repository: Option<&str>,
        common_tail_path: Option<&Path>,
    ) -> ApiResult<Value> {
        let main = tokio::fs::read_to_string(prompt_path)
            .await
            .map_err(|e| ApiError::io(prompt_path, e))?;

        let message = match common_tail_path {
            Some(tail_path) if tokio::fs::try_exists(tail_path).await.unwrap_or(false) => {
                let tail = tokio::fs::read_to_string(tail_path)
                    .await
                    .map_err(|e| ApiError::io(tail_path, e))?;
                format!("{main}\n\n{tail}")
            }
            _ => main,
        };

        self.create_conversation(&message, repository, None).await
    }

    /// Deletes a conversation.
    pub async fn delete_conversation(&self, conversation_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::delete(format!("/api/conversations/{conversation_id}")))
            .await
    }

    /// Starts the agent loop, optionally enabling one git provider.
    pub async fn start_conversation(
        &self,
        conversation_id: &str,
        git_provider: Option<&str>,
    ) -> ApiResult<Value> {
        let mut providers = Map::new();
        if let Some(provider) = git_provider.filter(|p| !p.is_empty()) {
            providers.insert(provider.to_string(), Value::Bool(true));
        }
        let request = ApiRequest::post(format!("/api/conversations/{conversation_id}/start"))
            .json_value(json!({ "providers_set": providers }));
        self.send(request).await
    }

    /// Stops a running conversation.
    pub async fn stop_conversation(&self, conversation_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::post(format!(
            "/api/conversations/{conversation_id}/stop"
        )))
        .await
    }

    /// Sends a user message to a conversation.
    pub async fn send_message(&self, conversation_id: &str, message: &str) -> ApiResult<Value> {
        let request = ApiRequest::post(format!("/api/conversations/{conversation_id}/message"))
            .json_value(json!({ "message": message }));
        self.send(request).await
    }

    /// Lists workspace files, optionally under a sub-path.
    pub async fn list_files(&self, conversation_id: &str, path: Option<&str>) -> ApiResult<Value> {
        let request = ApiRequest::get(format!("/api/conversations/{conversation_id}/list-files"))
            .query_opt("path", path.filter(|p| !p.is_empty()));
        self.send(request).await
    }

    /// Runtime configuration (`runtime_id`, `session_id`).
    pub async fn get_runtime_config(&self, conversation_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::get(format!(
            "/api/conversations/{conversation_id}/config"
        )))
        .await
    }

    /// VS Code URL of the runtime, if any.
    pub async fn get_vscode_url(&self, conversation_id: &str) -> ApiResult<Option<String>> {
        let value = self
            .send(ApiRequest::get(format!("/api/conversations/{conversation_id}/vscode-url")))
            .await?;
        Ok(value
            .get("vscode_url")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Web hosts exposed by the runtime, if any.
    pub async fn get_web_hosts(&self, conversation_id: &str) -> ApiResult<Option<Value>> {
        let value = self
            .send(ApiRequest::get(format!("/api/conversations/{conversation_id}/web-hosts")))
            .await?;
        Ok(value.get("hosts").filter(|h| !h.is_null()).cloned())
    }

    /// Microagents loaded for a conversation.
    pub async fn get_microagents(&self, conversation_id: &str) -> ApiResult<Vec<Value>> {
        let value = self
            .send(ApiRequest::get(format!("/api/conversations/{conversation_id}/microagents")))
            .await?;
        Ok(value
            .get("microagents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Submits feedback, optionally tied to one event.
    pub async fn submit_feedback(
        &self,
        conversation_id: &str,
        feedback_type: &str,
        feedback_text: &str,
        event: Option<u64>,
    ) -> ApiResult<Value> {
        let mut body = json!({
            "feedback_type": feedback_type,
            "feedback_text": feedback_text,
        });
        if let Some(id) = event {
            body["event_id"] = json!(id);
        }
        let request =
            ApiRequest::post(format!("/api/conversations/{conversation_id}/submit-feedback"))
                .json_value(body);
        self.send(request).await
    }

    /// Polls the conversation until it reaches a terminal status.
    pub async fn poll_until_stopped(
        &self,
        conversation_id: &str,
        settings: PollSettings,
    ) -> ApiResult<PollOutcome<ConversationDetails>> {
        let outcome = poll(
            settings,
            || self.get_conversation(conversation_id),
            |details| details.status.as_ref().is_some_and(|s| s.is_terminal()),
        )
        .await?;

        info!(
            conversation = conversation_id,
            attempts = outcome.attempts,
            status = ?outcome.last.status,
            end = ?outcome.end,
            "Polling finished"
        );
        Ok(outcome)
    }

    // ========================================================================
    // Events & Trajectory
    // ========================================================================

    /// Full trajectory. Falls back to the runtime's `/trajectory`.
    #[instrument(skip(self))]
    pub async fn get_trajectory(&self, conversation_id: &str) -> ApiResult<Value> {
        let request = ApiRequest::get(format!("/api/conversations/{conversation_id}/trajectory"))
            .resource(conversation_id)
            .secondary_path("/trajectory")
            .expect(PayloadShape::Object);
        self.send(request).await
    }

    /// Writes the trajectory as pretty JSON and returns the path written.
    ///
    /// The default file name is `trajectory_{id}.json`.
    pub async fn download_trajectory(
        &self,
        conversation_id: &str,
        path: Option<&Path>,
    ) -> ApiResult<PathBuf> {
        let trajectory = self.get_trajectory(conversation_id).await?;
        let path = path.map_or_else(
            || PathBuf::from(format!("trajectory_{conversation_id}.json")),
            Path::to_path_buf,
        );
        let mut content = serde_json::to_vec_pretty(&trajectory)?;
        content.push(b'\n');
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ApiError::io(&path, e))?;
        Ok(path)
    }

    /// One page of events. Falls back to the runtime's `/events`.
    #[instrument(skip(self))]
    pub async fn get_events(&self, conversation_id: &str, query: &EventQuery) -> ApiResult<EventPage> {
        let request = ApiRequest::get(format!("/api/conversations/{conversation_id}/events"))
            .query("start_id", query.start_id)
            .query_opt("end_id", query.end_id)
            .query("reverse", query.reverse)
            .query("limit", query.clamped_limit())
            .resource(conversation_id)
            .secondary_path("/events")
            .expect(PayloadShape::ObjectWithKey("events"));
        self.send_as(request).await
    }

    /// All events in id order, within `limits`.
    pub async fn iter_all_events(
        &self,
        conversation_id: &str,
        page_size: u32,
        limits: PageLimits,
    ) -> ApiResult<Paginated<Value>> {
        self.iter_events_paced(conversation_id, page_size, limits, Duration::ZERO)
            .await
    }

    /// Like [`Self::iter_all_events`], sleeping `page_delay` between pages.
    pub async fn iter_events_paced(
        &self,
        conversation_id: &str,
        page_size: u32,
        limits: PageLimits,
        page_delay: Duration,
    ) -> ApiResult<Paginated<Value>> {
        paginate(limits, None, |token| async move {
            let start_id = match token {
                Some(t) => {
                    if !page_delay.is_zero() {
                        tokio::time::sleep(page_delay).await;
                    }
                    t.parse().unwrap_or(0)
                }
                None => 0,
            };
            let page = self
                .get_events(conversation_id, &EventQuery::from_id(start_id, page_size))
                .await?;
            // An id-less last event still advances past the current start.
            let next = page
                .has_more
                .then(|| page.last_event_id().unwrap_or(start_id) + 1)
                .map(|id| id.to_string());
            Ok::<_, ApiError>(Page::new(page.events, next))
        })
        .await
    }

    /// Id of the newest event.
    pub async fn get_last_event_id(&self, conversation_id: &str) -> ApiResult<Option<u64>> {
        let page = self
            .get_events(conversation_id, &EventQuery::latest(1))
            .await?;
        Ok(page.events.first().and_then(event_id))
    }

    /// Model referenced by the most recent events.
    pub async fn get_recent_model(&self, conversation_id: &str) -> ApiResult<Option<String>> {
        let page = self
            .get_events(conversation_id, &EventQuery::latest(INSIGHT_WINDOW))
            .await?;
        Ok(insights::extract_model(&page.events))
    }

    /// First user message among the earliest events.
    pub async fn get_first_user_message(&self, conversation_id: &str) -> ApiResult<Option<String>> {
        let page = self
            .get_events(conversation_id, &EventQuery::from_id(0, INSIGHT_WINDOW))
            .await?;
        Ok(insights::first_user_message(&page.events))
    }

    /// Model referenced by the earliest events.
    pub async fn get_early_model(&self, conversation_id: &str) -> ApiResult<Option<String>> {
        let page = self
            .get_events(conversation_id, &EventQuery::from_id(0, INSIGHT_WINDOW))
            .await?;
        Ok(insights::extract_model(&page.events))
    }

    /// Details plus event count, recent model and first user message.
    #[instrument(skip(self))]
    pub async fn get_conversation_summary(
        &self,
        conversation_id: &str,
    ) -> ApiResult<ConversationSummary> {
        let details = self.get_conversation(conversation_id).await?;
        let last_event_id = self.get_last_event_id(conversation_id).await?;
        let model = self.get_recent_model(conversation_id).await?;
        let first_message = self.get_first_user_message(conversation_id).await?;
        Ok(ConversationSummary::build(
            &details,
            last_event_id,
            model,
            first_message.as_deref(),
        ))
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Stores LLM settings for the account.
    pub async fn store_llm_settings(
        &self,
        llm_model: &str,
        llm_base_url: Option<&str>,
        llm_api_key: Option<&str>,
    ) -> ApiResult<Value> {
        let mut body = Map::new();
        body.insert("llm_model".into(), json!(llm_model));
        if let Some(url) = llm_base_url.filter(|u| !u.is_empty()) {
            body.insert("llm_base_url".into(), json!(url));
        }
        if let Some(key) = llm_api_key.filter(|k| !k.is_empty()) {
            body.insert("llm_api_key".into(), json!(key));
        }
        self.send(ApiRequest::post("/api/settings").json_value(Value::Object(body)))
            .await
    }

    /// Account settings.
    pub async fn get_settings(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/api/settings")).await
    }

    /// Authenticated user.
    pub async fn get_user_info(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/api/user/info")).await
    }

    // ========================================================================
    // GitHub
    // ========================================================================

    /// Posts a comment on a GitHub issue or pull request.
    ///
    /// Authenticates with `token` instead of the OpenHands API key.
    #[instrument(skip(self, comment, token))]
    pub async fn post_github_comment(
        &self,
        repo: &str,
        issue_number: u64,
        comment: &str,
        token: &str,
    ) -> ApiResult<Value> {
        let credentials = Credentials::new(token).map_err(FetchError::from)?;
        let fetcher = ResourceFetcher::new(self.fetcher.http().clone(), credentials);
        let request = ApiRequest::post(format!("/repos/{repo}/issues/{issue_number}/comments"))
            .json_value(json!({ "body": comment }))
            .accept(GITHUB_MEDIA_TYPE)
            .expect(PayloadShape::Object);
        let created = fetcher
            .fetch(&ResourceLocator::primary(&self.github_api), &request)
            .await?
            .into_json()?;
        info!(repo, issue_number, "GitHub comment posted");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_query_clamps_limit() {
        assert_eq!(EventQuery::latest(0).clamped_limit(), 1);
        assert_eq!(EventQuery::from_id(5, 500).clamped_limit(), 100);
        assert_eq!(EventQuery::default().clamped_limit(), DEFAULT_EVENT_LIMIT);
        assert!(EventQuery::latest(1).reverse);
        assert!(!EventQuery::from_id(0, 1).reverse);
    }
}
