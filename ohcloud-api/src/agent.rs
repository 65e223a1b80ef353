//! Agent-server client.
//!
//! The agent server runs inside a conversation's sandbox and is reached
//! directly with the conversation's session key.

use std::time::Duration;

use ohcloud_fetch::{
    ApiRequest, HttpClient, Payload, PayloadShape, ResourceFetcher, ResourceLocator,
    SecondaryEndpoint,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::ApiResult;

/// Server-side timeout for bash commands, in seconds.
pub const BASH_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Client-side timeout for bash command requests.
const BASH_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for one agent server.
#[derive(Debug, Clone)]
pub struct AgentServerClient {
    fetcher: ResourceFetcher,
    base_url: String,
}

impl AgentServerClient {
    /// Creates a client for an agent server URL and session key.
    pub fn new(http: HttpClient, base_url: &str, session_key: impl Into<String>) -> Self {
        Self {
            fetcher: ResourceFetcher::with_session_key(http, session_key),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Creates a client from a discovered endpoint.
    pub fn from_endpoint(http: HttpClient, endpoint: &SecondaryEndpoint) -> Self {
        Self::new(http, endpoint.base_url(), endpoint.session_key())
    }

    /// Agent server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn payload(&self, request: ApiRequest) -> ApiResult<Payload> {
        let locator = ResourceLocator::primary(&self.base_url);
        Ok(self.fetcher.fetch(&locator, &request).await?)
    }

    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        Ok(self.payload(request).await?.into_json()?)
    }

    /// Searches a conversation's events.
    pub async fn search_events(&self, conversation_id: &str, limit: u32) -> ApiResult<Value> {
        let request = ApiRequest::get(format!("/api/conversations/{conversation_id}/events/search"))
            .query("limit", limit.max(1))
            .expect(PayloadShape::ObjectWithKey("items"));
        self.send(request).await
    }

    /// Counts a conversation's events.
    pub async fn count_events(&self, conversation_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::get(format!(
            "/api/conversations/{conversation_id}/events/count"
        )))
        .await
    }

    /// Runs a bash command in the sandbox.
    #[instrument(skip(self, command))]
    pub async fn execute_bash(&self, command: &str, cwd: Option<&str>) -> ApiResult<Value> {
        let mut body = json!({
            "command": command,
            "timeout": BASH_COMMAND_TIMEOUT_SECS,
        });
        if let Some(dir) = cwd.filter(|d| !d.is_empty()) {
            body["cwd"] = json!(dir);
        }
        let request = ApiRequest::post("/api/bash/execute_bash_command")
            .json_value(body)
            .timeout(BASH_REQUEST_TIMEOUT);
        self.send(request).await
    }

    /// Downloads a workspace file as raw bytes.
    #[instrument(skip(self))]
    pub async fn download_file(&self, path: &str) -> ApiResult<Vec<u8>> {
        let request = ApiRequest::get(format!("/api/file/download{}", absolute(path))).bytes();
        match self.payload(request).await? {
            Payload::Bytes { data, .. } => Ok(data),
            Payload::Json(v) => Ok(serde_json::to_vec(&v)?),
        }
    }

    /// Uploads a file to an absolute workspace path.
    ///
    /// An empty response body is reported as `{"success": true}`.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload_file(&self, path: &str, content: Vec<u8>) -> ApiResult<Value> {
        let path = absolute(path);
        let file_name = path.rsplit('/').next().unwrap_or_default().to_string();
        let request = ApiRequest::post(format!("/api/file/upload{path}")).multipart(
            "file",
            file_name,
            "text/plain",
            content,
        );
        let value = self.send(request).await?;
        Ok(if value.is_null() {
            json!({ "success": true })
        } else {
            value
        })
    }
}

fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        assert_eq!(absolute("workspace/a.txt"), "/workspace/a.txt");
        assert_eq!(absolute("/workspace/a.txt"), "/workspace/a.txt");
    }
}
