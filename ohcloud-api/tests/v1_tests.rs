//! V1 app-server and agent-server clients against mock servers.

use std::time::Duration;

use ohcloud_api::{AgentServerClient, ApiError, AppServerClient, StartConversation};
use ohcloud_core::{Credentials, StartTaskStatus};
use ohcloud_fetch::{HttpClient, PageLimits, PaginationEnd, PollEnd, PollSettings, ResourceFetcher};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, header_exists, method, path, query_param},
};

const SESSION_KEY: &str = "sess-agent";

fn client(server: &MockServer) -> AppServerClient {
    let fetcher = ResourceFetcher::new(
        HttpClient::new().unwrap(),
        Credentials::new("sk-oh-test").unwrap(),
    );
    AppServerClient::with_fetcher(fetcher, &server.uri())
}

async fn mount_app_conversation(app: &MockServer, agent: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations"))
        .and(query_param("ids", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": id,
            "sandbox_status": "RUNNING",
            "conversation_url": format!("{}/api/conversations/{id}", agent.uri()),
            "session_api_key": SESSION_KEY
        }])))
        .mount(app)
        .await;
}

#[tokio::test]
async fn test_get_app_conversation_remembers_agent() {
    let app = MockServer::start().await;
    let agent = MockServer::start().await;
    mount_app_conversation(&app, &agent, "c1").await;

    let client = client(&app);
    let conversation = client.get_app_conversation("c1").await.unwrap();

    assert_eq!(conversation.sandbox_status.as_deref(), Some("RUNNING"));
    let endpoint = client.agent_endpoint("c1").unwrap();
    assert_eq!(endpoint.base_url(), agent.uri());
    assert_eq!(endpoint.session_key(), SESSION_KEY);
}

#[tokio::test]
async fn test_unknown_app_conversation_is_not_found() {
    let app = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([null])))
        .mount(&app)
        .await;

    let err = client(&app).get_app_conversation("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ApiError::NotFound { kind: "app conversation", .. }));
}

#[tokio::test]
async fn test_search_events_fall_back_to_agent_server() {
    let app = MockServer::start().await;
    let agent = MockServer::start().await;
    mount_app_conversation(&app, &agent, "c1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/conversation/c1/events/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&app)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/events/search"))
        .and(header("x-session-api-key", SESSION_KEY))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "e1", "kind": "MessageEvent"}],
            "next_page_id": null
        })))
        .expect(1)
        .mount(&agent)
        .await;

    let client = client(&app);
    client.get_app_conversation("c1").await.unwrap();
    let events = client.search_events("c1", 50).await.unwrap();
    assert_eq!(events["items"][0]["id"], "e1");
}

#[tokio::test]
async fn test_search_all_app_conversations_follows_tokens() {
    let app = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations/search"))
        .and(query_param("page_id", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "c3"}],
            "next_page_id": null
        })))
        .mount(&app)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "c1"}, {"id": "c2"}],
            "next_page_id": "p2"
        })))
        .mount(&app)
        .await;

    let result = client(&app)
        .search_all_app_conversations(2, PageLimits::pages(5))
        .await
        .unwrap();

    let ids: Vec<_> = result.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2", "c3"]);
    assert_eq!(result.end, PaginationEnd::Exhausted);
}

#[tokio::test]
async fn test_start_and_wait_for_task() {
    let app = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/app-conversations"))
        .and(body_json(
            StartConversation::new("Fix the build").payload(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-1",
            "status": "WORKING"
        })))
        .expect(1)
        .mount(&app)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations/start-tasks"))
        .and(query_param("ids", "task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "task-1",
            "status": "READY",
            "app_conversation_id": "c9"
        }])))
        .mount(&app)
        .await;

    let client = client(&app);
    let task = client
        .start_app_conversation(&StartConversation::new("Fix the build"))
        .await
        .unwrap();
    assert_eq!(task.status, StartTaskStatus::InProgress("WORKING".to_string()));

    let settings = PollSettings::new(Duration::from_millis(10), Duration::from_secs(5));
    let outcome = client.wait_for_start_task("task-1", settings).await.unwrap();
    assert_eq!(outcome.end, PollEnd::Terminal);
    assert_eq!(outcome.last.app_conversation_id.as_deref(), Some("c9"));
}

#[tokio::test]
async fn test_download_trajectory_returns_archive_bytes() {
    let app = MockServer::start().await;
    let archive = vec![0x50, 0x4b, 0x03, 0x04, 0x00];

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations/c1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(archive.clone(), "application/zip"))
        .mount(&app)
        .await;

    let downloaded = client(&app).download_trajectory("c1").await.unwrap();
    assert_eq!(downloaded.data, archive);
    assert_eq!(downloaded.content_type.as_deref(), Some("application/zip"));
}

#[tokio::test]
async fn test_agent_client_without_runtime_is_missing_runtime() {
    let app = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/app-conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "c1",
            "sandbox_status": "PAUSED"
        }])))
        .mount(&app)
        .await;

    let err = client(&app).agent_client("c1").await.unwrap_err();
    assert!(matches!(err, ApiError::MissingRuntime(id) if id == "c1"));
}

// ============================================================================
// Agent Server
// ============================================================================

fn agent_client(server: &MockServer) -> AgentServerClient {
    AgentServerClient::new(HttpClient::new().unwrap(), &server.uri(), SESSION_KEY)
}

#[tokio::test]
async fn test_execute_bash_sends_session_key() {
    let agent = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/bash/execute_bash_command"))
        .and(header("x-session-api-key", SESSION_KEY))
        .and(body_json(json!({
            "command": "ls",
            "timeout": 30,
            "cwd": "/workspace"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exit_code": 0,
            "stdout": "README.md\n"
        })))
        .expect(1)
        .mount(&agent)
        .await;

    let result = agent_client(&agent)
        .execute_bash("ls", Some("/workspace"))
        .await
        .unwrap();
    assert_eq!(result["exit_code"], 0);

    let requests = agent.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_upload_file_with_empty_response() {
    let agent = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/file/upload/workspace/notes.txt"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&agent)
        .await;

    let result = agent_client(&agent)
        .upload_file("workspace/notes.txt", b"remember the milk".to_vec())
        .await
        .unwrap();
    assert_eq!(result, json!({"success": true}));

    let requests = agent.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("remember the milk"));
}

#[tokio::test]
async fn test_download_file_returns_raw_bytes() {
    let agent = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/file/download/workspace/out.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("line one\n", "text/plain"))
        .mount(&agent)
        .await;

    let data = agent_client(&agent)
        .download_file("/workspace/out.txt")
        .await
        .unwrap();
    assert_eq!(data, b"line one\n");
}
