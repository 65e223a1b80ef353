//! Pure helpers that read facts out of opaque event JSON.

use serde_json::Value;

const TOP_LEVEL_MODEL_KEYS: [&str; 4] = ["model", "llm_model", "provider_model", "selected_model"];
const META_MODEL_KEYS: [&str; 3] = ["model", "llm_model", "provider_model"];
const ARGS_MODEL_KEYS: [&str; 2] = ["model", "llm_model"];

/// Returns the first model name referenced by any event.
///
/// Per event, the lookup order is `tool_call_metadata.model_response.model`,
/// the top-level model keys, `metadata` (or `meta`), then `args`.
pub fn extract_model(events: &[Value]) -> Option<String> {
    events.iter().find_map(model_of)
}

fn model_of(event: &Value) -> Option<String> {
    if let Some(m) = event
        .pointer("/tool_call_metadata/model_response/model")
        .and_then(Value::as_str)
    {
        return Some(m.to_string());
    }

    if let Some(m) = first_str(event, &TOP_LEVEL_MODEL_KEYS) {
        return Some(m);
    }

    let meta = non_empty(event.get("metadata")).or_else(|| non_empty(event.get("meta")));
    if let Some(m) = meta.and_then(|meta| first_str(meta, &META_MODEL_KEYS)) {
        return Some(m);
    }

    event
        .get("args")
        .and_then(|args| first_str(args, &ARGS_MODEL_KEYS))
}

fn first_str(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn non_empty(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
}

/// Returns the trimmed text of the first user message.
///
/// `message` is preferred over `content`; blank text is skipped.
pub fn first_user_message(events: &[Value]) -> Option<String> {
    events
        .iter()
        .filter(|e| e.get("source").and_then(Value::as_str) == Some("user"))
        .find_map(|e| {
            let text = e
                .get("message")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| e.get("content").and_then(Value::as_str))?;
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}
