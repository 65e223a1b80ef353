// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ohcloud` Core
//!
//! Core types and models shared by every `ohcloud` crate.
//!
//! The remote service owns the shape of its payloads, so the models here only
//! name the fields this workspace reads and keep everything else in a
//! flattened map. Nothing returned by the service is dropped on the way
//! through.
//!
//! ## Key Types
//!
//! ### Credentials
//! - [`Credentials`] - Process-wide bearer token with a redacted `Debug`
//!
//! ### V0 API
//! - [`ConversationDetails`] - Conversation record, including runtime access
//! - [`ConversationStatus`] - Conversation lifecycle status
//! - [`EventPage`] - One page of conversation events
//! - [`ResultSet`] - `results` + `next_page_id` list envelope
//! - [`ConversationSummary`] - Derived overview of a conversation
//!
//! ### V1 API
//! - [`AppConversation`] - App-server conversation record
//! - [`StartTask`] / [`StartTaskStatus`] - Asynchronous conversation start
//! - [`SearchPage`] - `items` + `next_page_id` list envelope

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Credentials
    Credentials,
    // V0
    ConversationDetails,
    ConversationStatus,
    ConversationSummary,
    EventPage,
    ResultSet,
    event_id,
    // V1
    AppConversation,
    SearchPage,
    StartTask,
    StartTaskStatus,
};
