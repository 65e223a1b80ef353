//! JSON output formatting.

use anyhow::Result;
use ohcloud_fetch::{Paginated, PaginationEnd, PollEnd, PollOutcome};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a paginated listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedOutput<'a, T> {
    pub items: &'a [T],
    pub count: usize,
    pub pages: usize,
    pub end: &'static str,
    pub truncated: bool,
}

/// JSON output for a polling run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutput<'a, T> {
    pub last: &'a T,
    pub attempts: u32,
    pub end: &'static str,
    pub terminal: bool,
}

/// Wire name of a pagination stop reason.
pub fn pagination_end_name(end: PaginationEnd) -> &'static str {
    match end {
        PaginationEnd::Exhausted => "exhausted",
        PaginationEnd::PageLimit => "page_limit",
        PaginationEnd::ItemLimit => "item_limit",
    }
}

/// Wire name of a polling stop reason.
pub fn poll_end_name(end: PollEnd) -> &'static str {
    match end {
        PollEnd::Terminal => "terminal",
        PollEnd::Deadline => "deadline",
        PollEnd::MaxAttempts => "max_attempts",
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a paginated listing with its stop reason.
    pub fn format_paginated<T: Serialize>(&self, result: &Paginated<T>) -> Result<String> {
        self.format(&PaginatedOutput {
            items: &result.items,
            count: result.items.len(),
            pages: result.pages,
            end: pagination_end_name(result.end),
            truncated: result.is_truncated(),
        })
    }

    /// Formats a polling run with its stop reason.
    pub fn format_poll<T: Serialize>(&self, outcome: &PollOutcome<T>) -> Result<String> {
        self.format(&PollOutput {
            last: &outcome.last,
            attempts: outcome.attempts,
            end: poll_end_name(outcome.end),
            terminal: outcome.is_terminal(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let data = json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let data = json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_format_paginated() {
        let formatter = JsonFormatter::new(false);
        let result = Paginated {
            items: vec![json!({"id": 1}), json!({"id": 2})],
            pages: 3,
            end: PaginationEnd::PageLimit,
        };
        let output: Value = serde_json::from_str(&formatter.format_paginated(&result).unwrap()).unwrap();
        assert_eq!(
            output,
            json!({
                "items": [{"id": 1}, {"id": 2}],
                "count": 2,
                "pages": 3,
                "end": "page_limit",
                "truncated": true
            })
        );
    }

    #[test]
    fn test_format_poll() {
        let formatter = JsonFormatter::new(false);
        let outcome = PollOutcome {
            last: json!({"status": "RUNNING"}),
            attempts: 5,
            end: PollEnd::Deadline,
        };
        let output: Value = serde_json::from_str(&formatter.format_poll(&outcome).unwrap()).unwrap();
        assert_eq!(output["attempts"], 5);
        assert_eq!(output["end"], "deadline");
        assert_eq!(output["terminal"], false);
    }
}
