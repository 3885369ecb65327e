//! Time management utilities
//!
//! Every time-dependent decision in the crate (recheck intervals, the
//! scheduler budget, renderable ages) reads a [`Clock`] in microseconds,
//! so tests and replays can substitute a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Microseconds per millisecond
pub const USECS_PER_MSEC: u64 = 1_000;

/// Microseconds per second
pub const USECS_PER_SECOND: u64 = 1_000_000;

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Current monotonic time in microseconds
    fn now_usecs(&self) -> u64;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is the moment of construction
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_usecs(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Manually driven clock
///
/// Never moves on its own. Shared through an `Arc` it lets a test stand in
/// for a slow update by advancing time from inside the update callback.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at `start_usecs`
    pub fn new(start_usecs: u64) -> Self {
        Self { now: AtomicU64::new(start_usecs) }
    }

    /// Jump to an absolute time
    pub fn set(&self, usecs: u64) {
        self.now.store(usecs, Ordering::SeqCst);
    }

    /// Move time forward
    pub fn advance(&self, usecs: u64) {
        self.now.fetch_add(usecs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_usecs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
