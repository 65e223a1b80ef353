// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # `ohcloud` Fetch
//!
//! Request plumbing shared by every `ohcloud` client.
//!
//! ## Resource Fetcher
//!
//! - [`fetcher::ResourceFetcher`] - Sends a request to the primary endpoint
//!   and, on the "unavailable" signal only, once to the resource's secondary
//!   endpoint
//! - [`classify`] - The single predicate deciding what "unavailable" means
//! - [`request::ApiRequest`] - Endpoint-independent request description
//! - [`locator::ResourceLocator`] - Primary base URL plus an optional
//!   resource-bound secondary endpoint
//!
//! ## Helpers
//!
//! - [`paginate::paginate`] - Continuation-token pagination with mandatory bounds
//! - [`poll::poll`] - Interval polling bounded by deadline and attempt count
//!
//! ## Host
//!
//! - [`host::http`] - reqwest wrapper with tracing and per-call timeouts
//! - [`config::ClientConfig`] - API key, base URL and timeout from the environment
//!
//! ## Example
//!
//! ```ignore
//! use ohcloud_fetch::{ApiRequest, ClientConfig, ResourceLocator};
//!
//! let config = ClientConfig::from_env()?;
//! let fetcher = config.fetcher()?;
//! let locator = ResourceLocator::primary(config.base_url());
//! let user = fetcher.fetch(&locator, &ApiRequest::get("/api/user/info")).await?;
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod locator;
pub mod paginate;
pub mod poll;
pub mod request;

// Errors
pub use error::{FetchError, HttpError};

// Fetcher
pub use classify::{Payload, unavailable_signal};
pub use fetcher::{Auth, Endpoint, FetchAttempt, FetchOutcome, ResourceFetcher, SESSION_KEY_HEADER};
pub use locator::{ResourceLocator, SecondaryEndpoint};
pub use request::{ApiRequest, PayloadShape, RequestBody, ResponseKind};

// Helpers
pub use paginate::{Page, PageLimits, Paginated, PaginationEnd, paginate};
pub use poll::{PollEnd, PollOutcome, PollSettings, poll};

// Host & config
pub use config::{API_KEY_ENV, BASE_URL_ENV, ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use host::{HttpClient, RawResponse};
