//! End-to-end export against mock servers, then offline post-processing.

use std::time::Duration;

use ohcloud_api::CloudClient;
use ohcloud_core::{ConversationStatus, Credentials};
use ohcloud_export::{
    ExportDocument, RenderOptions, TruncateOptions, export_conversation, load_json,
    render_markdown, save_json, truncate_value,
};
use ohcloud_fetch::{HttpClient, PageLimits, PaginationEnd, ResourceFetcher};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const SESSION_KEY: &str = "sess-export";

fn client(server: &MockServer) -> CloudClient {
    let fetcher = ResourceFetcher::new(
        HttpClient::new().unwrap(),
        Credentials::new("sk-oh-test").unwrap(),
    );
    CloudClient::with_fetcher(fetcher, server.uri())
}

async fn mount_conversation(app: &MockServer, runtime: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/conversations/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "abc123",
            "title": "Fix flaky test",
            "status": "STOPPED",
            "url": format!("{}/runtime/abc123", runtime.uri()),
            "session_api_key": SESSION_KEY,
            "trigger": "gui"
        })))
        .mount(app)
        .await;
}

#[tokio::test]
async fn test_export_falls_back_to_runtime_and_pages() {
    let app = MockServer::start().await;
    let runtime = MockServer::start().await;
    mount_conversation(&app, &runtime).await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/abc123/events"))
        .respond_with(
            ResponseTemplate::new(502).set_body_raw("<!DOCTYPE html><title>502</title>", "text/html"),
        )
        .mount(&app)
        .await;

    Mock::given(method("GET"))
        .and(path("/runtime/abc123/events"))
        .and(header("x-session-api-key", SESSION_KEY))
        .and(query_param("start_id", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": 0, "source": "user", "message": "Please fix the flaky test"},
                {"id": 1, "source": "agent", "action": "run", "args": {"command": "cargo test"}}
            ],
            "has_more": true
        })))
        .expect(1)
        .mount(&runtime)
        .await;

    Mock::given(method("GET"))
        .and(path("/runtime/abc123/events"))
        .and(query_param("start_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": 2, "source": "agent", "observation": "run", "cause": 1, "content": "ok"}
            ],
            "has_more": false
        })))
        .expect(1)
        .mount(&runtime)
        .await;

    let export = export_conversation(
        &client(&app),
        "abc123",
        2,
        PageLimits::pages(10),
        Duration::from_millis(1),
    )
    .await
    .unwrap();

    assert_eq!(export.pages, 2);
    assert_eq!(export.end, PaginationEnd::Exhausted);
    assert!(!export.is_truncated());
    assert_eq!(export.document.events.len(), 3);
    assert_eq!(export.document.base_url, app.uri());
    assert_eq!(export.document.conversation["trigger"], "gui");
    assert_eq!(export.details.title.as_deref(), Some("Fix flaky test"));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports").join("abc123.json");
    export.document.save(&out).await.unwrap();

    let reloaded: ExportDocument = load_json(&out).await.unwrap();
    assert_eq!(reloaded.events, export.document.events);

    let raw: Value = load_json(&out).await.unwrap();
    let md = render_markdown(&raw, &RenderOptions::default()).unwrap();
    assert!(md.starts_with("# Fix flaky test\n"));
    assert!(md.contains("<summary>Tool call: run · cargo test</summary>"));
    assert!(md.contains("<summary>Tool result: run / run</summary>"));
}

#[tokio::test]
async fn test_export_stops_at_page_bound() {
    let app = MockServer::start().await;
    let runtime = MockServer::start().await;
    mount_conversation(&app, &runtime).await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/abc123/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"id": 0}, {"id": 1}],
            "has_more": true
        })))
        .expect(1)
        .mount(&app)
        .await;

    let export = export_conversation(
        &client(&app),
        "abc123",
        2,
        PageLimits::pages(1),
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(export.end, PaginationEnd::PageLimit);
    assert!(export.is_truncated());
}

#[tokio::test]
async fn test_truncated_copy_redacts_session_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");

    save_json(
        &input,
        &json!({
            "conversation": {"conversation_id": "abc123", "session_api_key": "sess-secret"},
            "events": [{"id": 0, "content": "z".repeat(6000)}]
        }),
    )
    .await
    .unwrap();

    let data: Value = load_json(&input).await.unwrap();
    save_json(&output, &truncate_value(&data, &TruncateOptions::default()))
        .await
        .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.contains("sess-secret"));
    assert!(text.contains("<truncated 5800 chars>"));
}

#[tokio::test]
async fn test_export_keeps_conversation_record_as_received() {
    let app = MockServer::start().await;
    let record = json!({
        "conversation_id": "c1",
        "title": "T",
        "status": "running",
        "url": null,
        "session_api_key": null,
        "zeta": 1,
        "alpha": 2
    });

    Mock::given(method("GET"))
        .and(path("/api/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
        .mount(&app)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [],
            "has_more": false
        })))
        .mount(&app)
        .await;

    let export = export_conversation(
        &client(&app),
        "c1",
        100,
        PageLimits::pages(10),
        Duration::ZERO,
    )
    .await
    .unwrap();
    assert_eq!(export.details.status, Some(ConversationStatus::Running));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("c1.json");
    export.document.save(&out).await.unwrap();

    let saved: Value = load_json(&out).await.unwrap();
    let conversation = &saved["conversation"];
    assert_eq!(conversation, &record);
    assert_eq!(conversation["status"], "running");
    assert!(conversation.as_object().unwrap().contains_key("url"));
    assert!(conversation["session_api_key"].is_null());

    let keys: Vec<&str> = conversation
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        keys,
        ["conversation_id", "title", "status", "url", "session_api_key", "zeta", "alpha"]
    );
}
