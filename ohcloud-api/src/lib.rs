// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # `ohcloud` API
//!
//! Clients for the OpenHands Cloud API. Every call goes through one
//! [`ohcloud_fetch::ResourceFetcher`], so the fallback rule is the same
//! everywhere.
//!
//! | Client | Surface | Fallback |
//! |--------|---------|----------|
//! | [`CloudClient`] | V0 `/api` | conversation runtime (`/events`, `/trajectory`) |
//! | [`AppServerClient`] | V1 `/api/v1` | agent server (`events/search`, `events/count`) |
//! | [`AgentServerClient`] | sandbox agent server | none, it is reached directly |
//!
//! ## Usage
//!
//! ```ignore
//! use ohcloud_api::CloudClient;
//! use ohcloud_fetch::{ClientConfig, PageLimits};
//!
//! let config = ClientConfig::from_env()?;
//! let client = CloudClient::new(&config)?;
//! let details = client.get_conversation("abc123").await?;
//! let events = client.iter_all_events("abc123", 100, PageLimits::pages(50)).await?;
//! ```

pub mod agent;
pub mod error;
pub mod insights;
pub mod v0;
pub mod v1;

pub use agent::AgentServerClient;
pub use error::{ApiError, ApiResult};
pub use insights::{extract_model, first_user_message};
pub use v0::{CloudClient, EventQuery};
pub use v1::{AppServerClient, StartConversation, TrajectoryArchive};
