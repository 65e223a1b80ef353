//! Host APIs used by the fetcher.
//!
//! - [`http`] - HTTP client with tracing and per-call timeouts

pub mod http;

pub use http::{HttpClient, RawResponse};
