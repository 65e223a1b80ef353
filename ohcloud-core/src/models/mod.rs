//! Domain models for `ohcloud`.
//!
//! ## Submodules
//!
//! - [`credentials`] - Bearer token handling
//! - [`conversation`] - V0 conversation records, statuses and summaries
//! - [`event`] - Event pages and list envelopes
//! - [`app`] - V1 app-server records (app conversations, start tasks)

mod app;
mod conversation;
mod credentials;
mod event;

// Re-export everything at the models level
pub use app::{AppConversation, SearchPage, StartTask, StartTaskStatus};
pub use conversation::{ConversationDetails, ConversationStatus, ConversationSummary};
pub use credentials::Credentials;
pub use event::{event_id, EventPage, ResultSet};
