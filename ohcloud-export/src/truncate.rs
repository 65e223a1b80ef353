//! Shortening of long strings in exported JSON.
//!
//! Every string is redacted; strings longer than `max_len` keep their head
//! and tail around a `...<truncated N chars>...` marker. Lengths count
//! characters, not bytes.

use serde_json::{Map, Value};

use crate::redact::{REDACTED, redact_secrets};

/// Keys whose non-empty string values are replaced wholesale.
pub const SENSITIVE_KEYS: [&str; 3] = ["session_api_key", "api_key", "llm_api_key"];

/// Default maximum string length.
pub const DEFAULT_MAX_LEN: usize = 5000;

/// Default number of leading characters kept.
pub const DEFAULT_HEAD: usize = 100;

/// Default number of trailing characters kept.
pub const DEFAULT_TAIL: usize = 100;

/// Truncation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncateOptions {
    /// Strings up to this many characters are kept whole.
    pub max_len: usize,
    /// Leading characters kept.
    pub head: usize,
    /// Trailing characters kept.
    pub tail: usize,
}

impl Default for TruncateOptions {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            head: DEFAULT_HEAD,
            tail: DEFAULT_TAIL,
        }
    }
}

impl TruncateOptions {
    /// Head and tail actually used; rebalanced when they would cover
    /// `max_len` on their own.
    pub fn effective(&self) -> (usize, usize) {
        if self.head + self.tail >= self.max_len {
            let head = self.max_len / 2;
            (head, self.max_len - head)
        } else {
            (self.head, self.tail)
        }
    }
}

/// Redacts and, when longer than `max_len`, shortens one string.
pub fn truncate_str(text: &str, options: &TruncateOptions) -> String {
    let text = redact_secrets(text);
    let len = text.chars().count();
    if len <= options.max_len {
        return text.into_owned();
    }
    let (head, tail) = options.effective();
    elide(&text, len, head, tail)
}

/// Keeps `head` leading and `tail` trailing characters of `text`.
pub(crate) fn elide(text: &str, len: usize, head: usize, tail: usize) -> String {
    let removed = len.saturating_sub(head + tail);
    let head_part: String = text.chars().take(head).collect();
    let tail_part: String = text.chars().skip(len.saturating_sub(tail)).collect();
    format!("{head_part}...<truncated {removed} chars>...{tail_part}")
}

/// Applies [`truncate_str`] to every string in `value`, redacting
/// [`SENSITIVE_KEYS`].
pub fn truncate_value(value: &Value, options: &TruncateOptions) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_str(s, options)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| truncate_value(item, options))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                let sensitive = SENSITIVE_KEYS.contains(&key.as_str())
                    && item.as_str().is_some_and(|s| !s.is_empty());
                let item = if sensitive {
                    Value::String(REDACTED.to_string())
                } else {
                    truncate_value(item, options)
                };
                out.insert(key.clone(), item);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
