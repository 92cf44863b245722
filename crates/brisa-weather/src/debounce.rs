//! Input pacing for autocomplete.
//!
//! `Debouncer` enforces the quiet period: only the last value of a burst
//! survives. `LatestQuery` tracks which request is current so a superseded
//! response can be discarded after it completes - there is no mid-flight
//! cancellation, only the hard client timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait out the quiet period. Returns `Some(value)` only if no newer
    /// call arrived meanwhile.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) == my_generation {
            Some(value)
        } else {
            None
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Monotonic token source: last issued wins.
#[derive(Default)]
pub struct LatestQuery {
    counter: AtomicU64,
}

impl LatestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new request, superseding all earlier ones.
    pub fn issue(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a response carrying this token should still be applied.
    pub fn is_current(&self, token: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == token
    }
}
