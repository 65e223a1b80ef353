//! CLI command implementations.

pub mod agent;
pub mod export;
pub mod render;
pub mod truncate;
pub mod v0;
pub mod v1;

use std::time::Duration;

use clap::Args;
use ohcloud_fetch::{PageLimits, PollSettings};
use thiserror::Error;

/// Polling stopped at its deadline or attempt bound.
#[derive(Debug, Error)]
#[error("Polling stopped after {attempts} attempts; last status {status}")]
pub struct PollIncomplete {
    /// Attempts made.
    pub attempts: u32,
    /// Last observed status.
    pub status: String,
}

/// Bounds shared by every paginated command.
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Stop after this many pages.
    #[arg(long, default_value = "50")]
    pub max_pages: usize,

    /// Stop after this many items.
    #[arg(long)]
    pub max_items: Option<usize>,
}

impl PageArgs {
    /// Pagination limits for the helper.
    pub fn limits(&self) -> PageLimits {
        PageLimits::pages(self.max_pages).with_max_items_opt(self.max_items)
    }
}

/// Timing shared by every polling command.
#[derive(Args, Debug, Clone, Copy)]
pub struct PollArgs {
    /// Seconds between polls.
    #[arg(long, default_value = "5")]
    pub interval: u64,

    /// Give up after this many seconds.
    #[arg(long, default_value = "300")]
    pub timeout_s: u64,

    /// Give up after this many polls (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,
}

impl PollArgs {
    /// Polling settings for the helper.
    pub fn settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.interval.max(1)),
            Duration::from_secs(self.timeout_s),
        )
        .with_max_attempts_opt(self.max_attempts)
    }
}
