//! Event pages and list envelopes.
//!
//! Events are opaque JSON objects; only `id` is interpreted here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of conversation events (V0 `/events`, runtime `/events`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events in this page.
    #[serde(default)]
    pub events: Vec<Value>,

    /// Whether more events follow this page.
    #[serde(default)]
    pub has_more: bool,
}

impl EventPage {
    /// Returns the id of the last event in the page, if it has one.
    pub fn last_event_id(&self) -> Option<u64> {
        self.events.last().and_then(event_id)
    }

    /// Returns the id of the first event in the page, if it has one.
    pub fn first_event_id(&self) -> Option<u64> {
        self.events.first().and_then(event_id)
    }
}

/// Reads the numeric `id` of an event.
pub fn event_id(event: &Value) -> Option<u64> {
    event.get("id").and_then(Value::as_u64)
}

/// List envelope used by V0 list endpoints (`results` + `next_page_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet<T> {
    /// Items in this page.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,

    /// Continuation token for the next page.
    #[serde(default)]
    pub next_page_id: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_page_ids() {
        let page: EventPage = serde_json::from_value(json!({
            "events": [{"id": 3}, {"id": 4}, {"id": 7}],
            "has_more": true
        }))
        .unwrap();

        assert_eq!(page.first_event_id(), Some(3));
        assert_eq!(page.last_event_id(), Some(7));
        assert!(page.has_more);
    }

    #[test]
    fn test_event_page_defaults() {
        let page: EventPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.events.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.last_event_id(), None);
    }

    #[test]
    fn test_result_set_without_token() {
        let set: ResultSet<Value> =
            serde_json::from_value(json!({"results": [{"a": 1}]})).unwrap();
        assert_eq!(set.results.len(), 1);
        assert!(set.next_page_id.is_none());
    }
}
