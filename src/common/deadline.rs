use std::{future::Future, time::Duration};

use tokio::time::{Instant, error::Elapsed, timeout_at};

/// Shortest budget a phase is ever started with, even past the deadline.
pub const MIN_BUDGET: Duration = Duration::from_millis(100);

/// Stand-in for timeouts too large to represent, roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Absolute point in time shared by every phase of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at }
    }

    /// Time left until the deadline, never less than [`MIN_BUDGET`].
    pub fn remaining(&self) -> Duration {
        self.at
            .saturating_duration_since(Instant::now())
            .max(MIN_BUDGET)
    }

    /// Runs `fut` until it completes or the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        timeout_at(self.at, fut).await
    }
}
