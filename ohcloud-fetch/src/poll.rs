//! Bounded polling for asynchronous completion.
//!
//! [`poll`] fetches a status resource at a fixed interval until it reaches a
//! terminal status, the deadline would be crossed, or the attempt bound is
//! hit. No attempt starts at or after the deadline, and the last observed
//! value is always returned.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

// ============================================================================
// Settings
// ============================================================================

/// Polling interval and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between attempts.
    pub interval: Duration,
    /// Total time budget, measured from the first attempt.
    pub deadline: Duration,
    /// Optional cap on the number of attempts. The first attempt is always
    /// made, so a cap below one acts as one.
    pub max_attempts: Option<u32>,
}

impl PollSettings {
    /// Creates settings with an interval and deadline.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline,
            max_attempts: None,
        }
    }

    /// Caps the number of attempts. Zero is raised to one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Sets the attempt cap if one is given.
    pub fn with_max_attempts_opt(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.map(|max| max.max(1));
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Why polling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    /// A terminal status was observed.
    Terminal,
    /// Another attempt would start at or after the deadline.
    Deadline,
    /// The attempt cap was reached.
    MaxAttempts,
}

/// Result of a polling run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome<T> {
    /// Last observed value.
    pub last: T,
    /// Number of attempts made.
    pub attempts: u32,
    /// Stop reason.
    pub end: PollEnd,
}

impl<T> PollOutcome<T> {
    /// Returns true if a terminal status was reached.
    pub fn is_terminal(&self) -> bool {
        self.end == PollEnd::Terminal
    }
}

// ============================================================================
// Poll
// ============================================================================

/// Polls `fetch` until `is_terminal` holds or a bound is reached.
///
/// The first attempt is made immediately. A failed attempt ends polling with
/// that error.
pub async fn poll<T, E, F, Fut, P>(
    settings: PollSettings,
    mut fetch: F,
    is_terminal: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let mut attempts = 0_u32;

    loop {
        let last = fetch().await?;
        attempts += 1;

        if is_terminal(&last) {
            debug!(attempts, "Terminal status reached");
            return Ok(PollOutcome {
                last,
                attempts,
                end: PollEnd::Terminal,
            });
        }

        if settings.max_attempts.is_some_and(|max| attempts >= max) {
            debug!(attempts, "Attempt limit reached");
            return Ok(PollOutcome {
                last,
                attempts,
                end: PollEnd::MaxAttempts,
            });
        }

        if start.elapsed() + settings.interval >= settings.deadline {
            debug!(attempts, elapsed = ?start.elapsed(), "Deadline reached");
            return Ok(PollOutcome {
                last,
                attempts,
                end: PollEnd::Deadline,
            });
        }

        sleep(settings.interval).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
