//! Conversation export.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ohcloud_api::CloudClient;
use ohcloud_core::ConversationDetails;
use ohcloud_fetch::{PageLimits, PaginationEnd};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::ExportResult;
use crate::persistence::save_json;

/// A conversation with all of its events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
    /// App base URL the export was taken from.
    pub base_url: String,
    /// Conversation record exactly as returned by the service.
    pub conversation: Value,
    /// Events in id order.
    pub events: Vec<Value>,
}

impl ExportDocument {
    /// Writes the document as pretty JSON.
    pub async fn save(&self, path: &Path) -> ExportResult<()> {
        save_json(path, self).await
    }
}

/// Result of [`export_conversation`].
#[derive(Debug, Clone)]
pub struct ConversationExport {
    /// The exported document.
    pub document: ExportDocument,
    /// Typed view of the conversation record.
    pub details: ConversationDetails,
    /// Event pages fetched.
    pub pages: usize,
    /// Why event paging stopped.
    pub end: PaginationEnd,
}

impl ConversationExport {
    /// Returns true if events may be missing because a bound was hit.
    pub fn is_truncated(&self) -> bool {
        self.end != PaginationEnd::Exhausted
    }
}

/// Fetches a conversation and every event within `limits`.
///
/// Fetching the details first lets event pages fall back to the
/// conversation's runtime.
#[instrument(skip(client, limits))]
pub async fn export_conversation(
    client: &CloudClient,
    conversation_id: &str,
    page_size: u32,
    limits: PageLimits,
    page_delay: Duration,
) -> ExportResult<ConversationExport> {
    let (conversation, details) = client.get_conversation_record(conversation_id).await?;
    let paged = client
        .iter_events_paced(conversation_id, page_size, limits, page_delay)
        .await?;

    let events: Vec<Value> = paged.items.into_iter().filter(Value::is_object).collect();
    if paged.end != PaginationEnd::Exhausted {
        warn!(
            conversation = conversation_id,
            pages = paged.pages,
            end = ?paged.end,
            "Event export stopped at a bound"
        );
    }
    info!(
        conversation = conversation_id,
        events = events.len(),
        pages = paged.pages,
        "Conversation exported"
    );

    Ok(ConversationExport {
        document: ExportDocument {
            exported_at: Utc::now(),
            base_url: client.base_url().to_string(),
            conversation,
            events,
        },
        details,
        pages: paged.pages,
        end: paged.end,
    })
}
