//! Markdown transcript of an export document.
//!
//! Messages are shown plainly. Tool calls and tool results are wrapped in
//! collapsed `<details>` blocks, and tool output is shortened to its head
//! and tail.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{ExportError, ExportResult};
use crate::redact::redact_secrets;
use crate::truncate::{DEFAULT_HEAD, DEFAULT_TAIL, elide};

/// Characters of a command shown in a tool-call summary.
const COMMAND_PREVIEW_CHARS: usize = 120;

/// Tool output within this many characters of `head + tail` is kept whole.
const ELIDE_SLACK: usize = 20;

/// Rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Leading characters of tool output kept.
    pub head: usize,
    /// Trailing characters of tool output kept.
    pub tail: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            head: DEFAULT_HEAD,
            tail: DEFAULT_TAIL,
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// Renders an export document (`conversation` object + `events` array).
pub fn render_markdown(document: &Value, options: &RenderOptions) -> ExportResult<String> {
    let (Some(conversation), Some(events)) = (
        document.get("conversation").and_then(Value::as_object),
        document.get("events").and_then(Value::as_array),
    ) else {
        return Err(ExportError::InvalidInput(
            "expected an object with a `conversation` object and an `events` array".to_string(),
        ));
    };

    let tool_calls: HashMap<i64, &Map<String, Value>> = events
        .iter()
        .filter_map(Value::as_object)
        .filter(|e| e.contains_key("action"))
        .filter_map(|e| e.get("id").and_then(Value::as_i64).map(|id| (id, e)))
        .collect();

    let title = text_of(conversation.get("title"))
        .or_else(|| text_of(conversation.get("conversation_id")))
        .unwrap_or_else(|| "Conversation".to_string());

    let mut out = vec![format!("# {title}\n"), "## Metadata\n".to_string()];
    out.push(format!(
        "- Conversation ID: `{}`",
        text_of(conversation.get("conversation_id")).unwrap_or_default()
    ));
    for (key, label) in [
        ("selected_repository", "Repo"),
        ("selected_branch", "Branch"),
        ("created_at", "Created"),
        ("last_updated_at", "Last updated"),
        ("status", "Status"),
    ] {
        if let Some(value) = text_of(conversation.get(key)) {
            out.push(format!("- {label}: `{value}`"));
        }
    }
    out.push(String::new());

    out.push("## Transcript\n".to_string());
    for event in events.iter().filter_map(Value::as_object) {
        let chunk = render_event(event, &tool_calls, options);
        if !chunk.trim().is_empty() {
            out.push(chunk);
        }
    }

    let mut markdown = out.join("\n").trim_end().to_string();
    markdown.push('\n');
    Ok(markdown)
}

// ============================================================================
// Events
// ============================================================================

fn render_event(
    event: &Map<String, Value>,
    tool_calls: &HashMap<i64, &Map<String, Value>>,
    options: &RenderOptions,
) -> String {
    let header = header(event);

    if event.contains_key("action") {
        return render_tool_call(event, header);
    }
    if event.contains_key("observation") {
        return render_observation(event, header, tool_calls, options);
    }

    let text = event_text(event);
    if text.is_empty() {
        return String::new();
    }
    [header, String::new(), text.trim().to_string(), String::new()].join("\n")
}

fn header(event: &Map<String, Value>) -> String {
    let mut header = match text_of(event.get("source")) {
        Some(source) => format!("**{source}**"),
        None => "**event**".to_string(),
    };
    if let Some(ts) = event
        .get("timestamp")
        .and_then(Value::as_str)
        .filter(|ts| !ts.is_empty())
    {
        header.push_str(" · ");
        header.push_str(&normalize_timestamp(ts));
    }
    if let Some(id) = event.get("id").and_then(Value::as_i64) {
        header.push_str(&format!(" · id={id}"));
    }
    header
}

fn render_tool_call(event: &Map<String, Value>, header: String) -> String {
    let mut bits = Vec::new();
    if let Some(action) = event.get("action").and_then(Value::as_str) {
        bits.push(action.to_string());
    }
    if let Some(command) = event
        .get("args")
        .and_then(|args| args.get("command"))
        .and_then(Value::as_str)
    {
        bits.push(
            command
                .replace('\n', " ")
                .chars()
                .take(COMMAND_PREVIEW_CHARS)
                .collect(),
        );
    }
    let summary = if bits.is_empty() {
        "tool call".to_string()
    } else {
        bits.join(" · ")
    };

    let call: Map<String, Value> = ["action", "args", "timeout"]
        .into_iter()
        .filter_map(|k| event.get(k).map(|v| (k.to_string(), v.clone())))
        .collect();

    [
        header,
        String::new(),
        format!("<details>\n<summary>Tool call: {summary}</summary>\n"),
        "\n```json".to_string(),
        safe_json(&Value::Object(call)),
        "```\n</details>\n".to_string(),
    ]
    .join("\n")
}

fn render_observation(
    event: &Map<String, Value>,
    header: String,
    tool_calls: &HashMap<i64, &Map<String, Value>>,
    options: &RenderOptions,
) -> String {
    let observation = event
        .get("observation")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let cause = event
        .get("cause")
        .and_then(Value::as_i64)
        .and_then(|id| tool_calls.get(&id))
        .and_then(|call| call.get("action"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let summary = match (observation, cause) {
        (Some(o), Some(c)) => format!("{o} / {c}"),
        (Some(one), None) | (None, Some(one)) => one.to_string(),
        (None, None) => "tool result".to_string(),
    };

    let mut body = vec![
        header,
        String::new(),
        format!("<details>\n<summary>Tool result: {summary}</summary>\n"),
    ];

    let content = event_text(event);
    if !content.is_empty() {
        body.push("\n```text".to_string());
        body.push(shorten(content, options).trim_end().to_string());
        body.push("```".to_string());
    }

    if let Some(extras) = event.get("extras").filter(|v| is_truthy(v)) {
        body.push("\n```json".to_string());
        body.push(safe_json(extras));
        body.push("```".to_string());
    }

    body.push("\n</details>\n".to_string());
    body.join("\n")
}

// ============================================================================
// Helpers
// ============================================================================

/// `content` when non-blank, else `message` when non-blank.
fn event_text(event: &Map<String, Value>) -> &str {
    ["content", "message"]
        .into_iter()
        .filter_map(|k| event.get(k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

fn shorten(text: &str, options: &RenderOptions) -> String {
    let text = redact_secrets(text);
    let len = text.chars().count();
    if len <= options.head + options.tail + ELIDE_SLACK {
        return text.into_owned();
    }
    elide(&text, len, options.head, options.tail)
}

/// Pretty JSON with sorted keys, redacted.
fn safe_json(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(&sort_keys(value)).unwrap_or_default();
    redact_secrets(&pretty).into_owned()
}

// Maps keep insertion order (serde_json `preserve_order`), so keys are
// sorted here explicitly.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Converts a timestamp to UTC with a `Z` suffix; unparseable input is
/// returned unchanged. Timestamps without an offset are taken as UTC.
pub fn normalize_timestamp(ts: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true);
    }
    match NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Err(_) => ts.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Display text of a truthy value.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        v if is_truthy(v) && !v.is_string() => Some(v.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_keys_orders_nested_objects() {
        let sorted = sort_keys(&json!({"zeta": 1, "alpha": {"b": 2, "a": [{"y": 0, "x": 0}]}}));
        assert_eq!(
            serde_json::to_string(&sorted).unwrap(),
            r#"{"alpha":{"a":[{"x":0,"y":0}],"b":2},"zeta":1}"#
        );
    }

    fn document(events: Value) -> Value {
        json!({
            "exported_at": "2024-05-01T10:00:00+00:00",
            "base_url": "https://app.all-hands.dev",
            "conversation": {
                "conversation_id": "abc123",
                "title": "Fix flaky test",
                "selected_repository": "acme/widgets",
                "status": "STOPPED"
            },
            "events": events
        })
    }

    #[test]
    fn test_rejects_non_export_input() {
        let err = render_markdown(&json!({"events": []}), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidInput(_)));

        let err = render_markdown(&json!([1, 2]), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidInput(_)));
    }

    #[test]
    fn test_metadata_and_message() {
        let md = render_markdown(
            &document(json!([
                {"id": 0, "source": "user", "timestamp": "2024-05-01T12:00:00+02:00", "message": "  Please fix it  "},
                {"id": 1, "source": "agent", "message": ""}
            ])),
            &RenderOptions::default(),
        )
        .unwrap();

        assert!(md.starts_with("# Fix flaky test\n\n## Metadata\n\n- Conversation ID: `abc123`\n"));
        assert!(md.contains("- Repo: `acme/widgets`\n"));
        assert!(md.contains("- Status: `STOPPED`\n"));
        assert!(!md.contains("- Branch:"));
        assert!(md.contains("**user** · 2024-05-01T10:00:00Z · id=0\n\nPlease fix it\n"));
        assert!(!md.contains("id=1"));
        assert!(md.ends_with("Please fix it\n"));
    }

    #[test]
    fn test_tool_call_and_result() {
        let md = render_markdown(
            &document(json!([
                {
                    "id": 2,
                    "source": "agent",
                    "action": "run",
                    "args": {"thought": "", "command": "git push https://tok@github.com/acme/w.git\nls"},
                    "timeout": 120
                },
                {
                    "id": 3,
                    "source": "agent",
                    "observation": "run",
                    "cause": 2,
                    "content": "x".repeat(300),
                    "extras": {"exit_code": 0}
                }
            ])),
            &RenderOptions { head: 10, tail: 10 },
        )
        .unwrap();

        assert!(md.contains("<summary>Tool call: run · git push https://tok@github.com/acme/w.git ls</summary>"));
        assert!(md.contains("\"command\": \"git push https://<redacted>@github.com/acme/w.git\\nls\""));
        assert!(md.contains("\"action\": \"run\",\n  \"args\""));
        assert!(md.contains("<summary>Tool result: run / run</summary>"));
        assert!(md.contains(&format!(
            "```text\n{}...<truncated 280 chars>...{}\n```",
            "x".repeat(10),
            "x".repeat(10)
        )));
        assert!(md.contains("```json\n{\n  \"exit_code\": 0\n}\n```"));
    }

    #[test]
    fn test_short_tool_output_kept_whole() {
        let md = render_markdown(
            &document(json!([
                {"id": 5, "observation": "read", "content": "y".repeat(40)}
            ])),
            &RenderOptions { head: 10, tail: 10 },
        )
        .unwrap();
        assert!(md.contains(&"y".repeat(40)));
        assert!(md.contains("**event** · id=5"));
        assert!(md.contains("<summary>Tool result: read</summary>"));
    }

    #[test]
    fn test_title_fallbacks() {
        let doc = json!({"conversation": {"conversation_id": "xyz"}, "events": []});
        let md = render_markdown(&doc, &RenderOptions::default()).unwrap();
        assert!(md.starts_with("# xyz\n"));

        let doc = json!({"conversation": {}, "events": []});
        let md = render_markdown(&doc, &RenderOptions::default()).unwrap();
        assert!(md.starts_with("# Conversation\n"));
        assert!(md.ends_with("## Transcript\n"));
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp("2024-05-01T12:00:00Z"), "2024-05-01T12:00:00Z");
        assert_eq!(
            normalize_timestamp("2024-05-01T12:00:00.250+01:00"),
            "2024-05-01T11:00:00.250Z"
        );
        assert_eq!(
            normalize_timestamp("2024-05-01T12:00:00.123456"),
            "2024-05-01T12:00:00.123456Z"
        );
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }
}
