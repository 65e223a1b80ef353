// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # `ohcloud` Export
//!
//! Conversation export and offline post-processing.
//!
//! This crate provides:
//!
//! - **Export**: a conversation's details plus every event, paged with the
//!   runtime fallback
//! - **Truncate**: redacted copy of an export with long strings shortened
//! - **Markdown**: readable transcript of an export
//! - **Persistence**: atomic, owner-only artifact writes
//!
//! ## Usage
//!
//! ```ignore
//! use ohcloud_export::{export_conversation, render_markdown, RenderOptions};
//!
//! let export = export_conversation(&client, "abc123", 100, PageLimits::pages(1000), Duration::ZERO).await?;
//! export.document.save(Path::new("conv.json")).await?;
//! let md = render_markdown(&serde_json::to_value(&export.document)?, &RenderOptions::default())?;
//! ```

pub mod error;
pub mod export;
pub mod markdown;
pub mod persistence;
pub mod redact;
pub mod truncate;

pub use error::{ExportError, ExportResult};
pub use export::{ConversationExport, ExportDocument, export_conversation};
pub use markdown::{RenderOptions, normalize_timestamp, render_markdown};
pub use persistence::{load_json, save_bytes, save_json, save_text};
pub use redact::redact_secrets;
pub use truncate::{TruncateOptions, truncate_str, truncate_value};
