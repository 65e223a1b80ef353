//! Text output formatting with colors.

use ohcloud_core::{AppConversation, ConversationDetails, ConversationStatus, ConversationSummary};
use ohcloud_fetch::{Paginated, PollOutcome};
use serde_json::Value;

use super::json::{pagination_end_name, poll_end_name};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Characters of event text shown per line.
const EVENT_PREVIEW_CHARS: usize = 100;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Generic values
    // ========================================================================

    /// Formats any JSON value as indented `key: value` lines.
    pub fn format_value(&self, value: &Value) -> String {
        let mut lines = Vec::new();
        self.push_value(&mut lines, value, 0);
        lines.join("\n")
    }

    fn push_value(&self, lines: &mut Vec<String>, value: &Value, depth: usize) {
        let indent = "  ".repeat(depth);
        match value {
            Value::Object(map) if map.is_empty() => lines.push(format!("{indent}{{}}")),
            Value::Object(map) => {
                for (key, item) in map {
                    match item {
                        Value::Object(m) if !m.is_empty() => {
                            lines.push(format!("{indent}{}:", self.bold(key)));
                            self.push_value(lines, item, depth + 1);
                        }
                        Value::Array(a) if !a.is_empty() => {
                            lines.push(format!("{indent}{}:", self.bold(key)));
                            self.push_value(lines, item, depth + 1);
                        }
                        _ => lines.push(format!("{indent}{}: {}", self.bold(key), scalar(item))),
                    }
                }
            }
            Value::Array(items) if items.is_empty() => lines.push(format!("{indent}[]")),
            Value::Array(items) => {
                for item in items {
                    if item.is_object() || item.is_array() {
                        lines.push(format!("{indent}-"));
                        self.push_value(lines, item, depth + 1);
                    } else {
                        lines.push(format!("{indent}- {}", scalar(item)));
                    }
                }
            }
            other => lines.push(format!("{indent}{}", scalar(other))),
        }
    }

    // ========================================================================
    // Conversations
    // ========================================================================

    /// Formats V0 conversations as a table.
    pub fn format_conversations(&self, result: &Paginated<ConversationDetails>) -> String {
        let mut lines = vec![format!(
            "{:<34} {:<10} {}",
            self.bold("ID"),
            self.bold("Status"),
            self.bold("Title")
        )];
        for c in &result.items {
            let status = c
                .status
                .as_ref()
                .map_or_else(|| "-".to_string(), |s| self.status(s));
            lines.push(format!(
                "{:<34} {:<10} {}",
                c.conversation_id,
                status,
                c.title.as_deref().unwrap_or("-")
            ));
        }
        lines.push(self.pagination_footer(result));
        lines.join("\n")
    }

    /// Formats V1 app conversations as a table.
    pub fn format_app_conversations(&self, result: &Paginated<AppConversation>) -> String {
        let mut lines = vec![format!(
            "{:<34} {:<12} {}",
            self.bold("ID"),
            self.bold("Sandbox"),
            self.bold("Title")
        )];
        for c in &result.items {
            lines.push(format!(
                "{:<34} {:<12} {}",
                c.id,
                c.sandbox_status.as_deref().unwrap_or("-"),
                c.title.as_deref().unwrap_or("-")
            ));
        }
        lines.push(self.pagination_footer(result));
        lines.join("\n")
    }

    /// Formats a conversation summary.
    pub fn format_summary(&self, summary: &ConversationSummary) -> String {
        let mut lines = vec![
            self.bold(summary.title.as_deref().unwrap_or(&summary.conversation_id)),
            "─".repeat(50),
        ];
        lines.push(format!("ID:        {}", summary.conversation_id));
        if let Some(status) = &summary.status {
            lines.push(format!("Status:    {}", self.status(status)));
        }
        if let Some(repo) = &summary.repository {
            let branch = summary
                .branch
                .as_deref()
                .map(|b| format!(" @ {b}"))
                .unwrap_or_default();
            lines.push(format!("Repo:      {}{branch}", self.cyan(repo)));
        }
        if let Some(model) = &summary.model {
            lines.push(format!("Model:     {model}"));
        }
        lines.push(format!("Events:    {}", summary.event_count));
        if let Some(created) = &summary.created_at {
            lines.push(format!("Created:   {created}"));
        }
        if let Some(updated) = &summary.last_updated_at {
            lines.push(format!("Updated:   {updated}"));
        }
        let runtime = if summary.has_runtime {
            self.green("reachable")
        } else {
            self.dim("none")
        };
        lines.push(format!("Runtime:   {runtime}"));
        if let Some(first) = &summary.first_message {
            lines.push(String::new());
            lines.push(self.dim("First message:"));
            lines.push(first.clone());
        }
        lines.join("\n")
    }

    // ========================================================================
    // Events / Polling
    // ========================================================================

    /// Formats events one per line: id, source, kind and a text preview.
    pub fn format_events(&self, events: &[Value]) -> String {
        events
            .iter()
            .map(|e| {
                let id = e.get("id").map_or_else(|| "-".to_string(), scalar);
                let source = e.get("source").and_then(Value::as_str).unwrap_or("-");
                let kind = ["action", "observation", "kind"]
                    .into_iter()
                    .find_map(|k| e.get(k).and_then(Value::as_str))
                    .unwrap_or("message");
                let text: String = ["message", "content"]
                    .into_iter()
                    .find_map(|k| e.get(k).and_then(Value::as_str))
                    .unwrap_or_default()
                    .replace('\n', " ")
                    .chars()
                    .take(EVENT_PREVIEW_CHARS)
                    .collect();
                format!(
                    "{} {:<12} {:<16} {}",
                    self.dim(&format!("#{id:<5}")),
                    source,
                    kind,
                    text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the footer line of a polling run.
    pub fn format_poll<T>(&self, outcome: &PollOutcome<T>, status: &str) -> String {
        let end = poll_end_name(outcome.end);
        let line = format!(
            "Status {status} after {} attempt{} ({end})",
            outcome.attempts,
            if outcome.attempts == 1 { "" } else { "s" }
        );
        if outcome.is_terminal() {
            self.green(&line)
        } else {
            self.yellow(&line)
        }
    }

    fn pagination_footer<T>(&self, result: &Paginated<T>) -> String {
        let line = format!(
            "{} item{} in {} page{} ({})",
            result.items.len(),
            if result.items.len() == 1 { "" } else { "s" },
            result.pages,
            if result.pages == 1 { "" } else { "s" },
            pagination_end_name(result.end)
        );
        if result.is_truncated() {
            self.yellow(&line)
        } else {
            self.dim(&line)
        }
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    /// Colors a conversation status.
    pub fn status(&self, status: &ConversationStatus) -> String {
        match status {
            ConversationStatus::Running => self.green(status.as_str()),
            s if s.is_failure() => self.red(s.as_str()),
            s if s.is_terminal() => self.dim(s.as_str()),
            s => self.yellow(s.as_str()),
        }
    }

    fn colorize(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.colorize(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.colorize(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.colorize(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.colorize(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.colorize(CYAN, text)
    }
}

/// Scalar JSON without quotes around strings.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
