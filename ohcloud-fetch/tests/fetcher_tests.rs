//! Fetcher behaviour against mock HTTP servers.

use ohcloud_core::Credentials;
use ohcloud_fetch::{
    ApiRequest, Endpoint, FetchError, HttpClient, Page, PageLimits, PaginationEnd, PayloadShape,
    ResourceFetcher, ResourceLocator, SecondaryEndpoint, paginate,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const API_KEY: &str = "sk-oh-test-key";
const SESSION_KEY: &str = "sess-runtime-key";
const MAINTENANCE_PAGE: &str = "<!DOCTYPE html><html><body>Down for maintenance</body></html>";

fn fetcher() -> ResourceFetcher {
    ResourceFetcher::new(
        HttpClient::new().unwrap(),
        Credentials::new(API_KEY).unwrap(),
    )
}

fn events_request(conversation: &str) -> ApiRequest {
    ApiRequest::get(format!("/api/conversations/{conversation}/events"))
        .query("limit", 100)
        .resource(conversation)
        .secondary_path("/events")
        .expect(PayloadShape::ObjectWithKey("events"))
}

fn runtime(server: &MockServer, conversation: &str) -> SecondaryEndpoint {
    SecondaryEndpoint::new(
        conversation,
        format!("{}/runtime/{conversation}", server.uri()),
        SESSION_KEY,
    )
}

#[tokio::test]
async fn test_well_formed_primary_makes_no_secondary_call() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/conv-a/events"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"id": 0}, {"id": 1}, {"id": 2}],
            "has_more": false
        })))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 1);
    assert_eq!(outcome.served_by(), Some(Endpoint::Primary));
    let payload = outcome.result.unwrap().into_json().unwrap();
    assert_eq!(payload["events"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_maintenance_page_falls_back_to_secondary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/conv-a/events"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(MAINTENANCE_PAGE, "text/html"))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .and(path("/runtime/conv-a/events"))
        .and(query_param("limit", "100"))
        .and(header("x-session-api-key", SESSION_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"id": 7}],
            "has_more": true
        })))
        .expect(1)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 2);
    assert_eq!(outcome.served_by(), Some(Endpoint::Secondary));
    assert_eq!(outcome.attempts[0].status, Some(200));
    let payload = outcome.result.unwrap().into_json().unwrap();
    assert_eq!(payload["events"][0]["id"], 7);

    let requests = secondary.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_service_unavailable_status_falls_back() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "maintenance"})))
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .and(path("/runtime/conv-a/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .expect(1)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let payload = fetcher()
        .fetch(&locator, &events_request("conv-a"))
        .await
        .unwrap();
    assert_eq!(payload.as_json(), Some(&json!({"events": []})));
}

#[tokio::test]
async fn test_auth_failure_is_returned_without_fallback() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad key"})))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 1);
    match outcome.result {
        Err(FetchError::AuthenticationFailed { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected authentication failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_without_secondary_is_surfaced() {
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(MAINTENANCE_PAGE, "text/html"))
        .expect(1)
        .mount(&primary)
        .await;

    let locator = ResourceLocator::primary(primary.uri());
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 1);
    assert!(outcome.result.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn test_secondary_for_other_resource_is_never_used() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(MAINTENANCE_PAGE, "text/html"))
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .expect(0)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-b")).await;

    assert_eq!(outcome.attempts_count(), 1);
    assert!(outcome.result.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn test_failed_fallback_is_not_retried() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(MAINTENANCE_PAGE, "text/html"))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 2);
    assert!(outcome.used_fallback());
    assert!(outcome.served_by().is_none());
    assert!(outcome.result.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn test_not_found_is_surfaced_verbatim() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Conversation not found"})),
        )
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let locator =
        ResourceLocator::primary(primary.uri()).with_secondary(runtime(&secondary, "conv-a"));
    let err = fetcher()
        .fetch(&locator, &events_request("conv-a"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("Conversation not found"));
}

#[tokio::test]
async fn test_transport_error_does_not_fall_back() {
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let locator = ResourceLocator::primary("http://127.0.0.1:9")
        .with_secondary(runtime(&secondary, "conv-a"));
    let outcome = fetcher().execute(&locator, &events_request("conv-a")).await;

    assert_eq!(outcome.attempts_count(), 1);
    assert!(matches!(
        outcome.result,
        Err(FetchError::Transport { .. } | FetchError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_pagination_is_bounded_when_server_never_finishes() {
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"conversation_id": "a"}, {"conversation_id": "b"}],
            "next_page_id": "again"
        })))
        .expect(3)
        .mount(&primary)
        .await;

    let fetcher = fetcher();
    let locator = ResourceLocator::primary(primary.uri());

    let result = paginate(PageLimits::pages(3), None, |token| {
        let request = ApiRequest::get("/api/conversations")
            .query("limit", 2)
            .query_opt("page_id", token)
            .expect(PayloadShape::ObjectWithKey("results"));
        let fetcher = &fetcher;
        let locator = &locator;
        async move {
            let value = fetcher.fetch(locator, &request).await?.into_json()?;
            let items = value["results"].as_array().cloned().unwrap_or_default();
            let next = value["next_page_id"].as_str().map(str::to_string);
            Ok::<_, FetchError>(Page::new(items, next))
        }
    })
    .await
    .unwrap();

    assert_eq!(result.pages, 3);
    assert_eq!(result.items.len(), 6);
    assert_eq!(result.end, PaginationEnd::PageLimit);
    assert!(result.items.iter().all(Value::is_object));
}

#[tokio::test]
async fn test_accept_override_replaces_json_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let locator = ResourceLocator::primary(server.uri());
    let fetcher = fetcher();
    fetcher
        .fetch(&locator, &ApiRequest::get("/plain"))
        .await
        .unwrap();
    fetcher
        .fetch(
            &locator,
            &ApiRequest::get("/custom").accept("application/vnd.github.v3+json"),
        )
        .await
        .unwrap();
}
