//! Termination detection for dynamically generated work.
//!
//! A pair of monotone counters, `started` and `finished`, is shared by every
//! participant. A task increments `started` *before* enqueuing derived work
//! and `finished` *after* its handler completes, so the number of pending
//! work items never exceeds `started - finished`. Quiescence is a consistent
//! observation of `started == finished`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Distributed started/finished counter pair with quiescence wait.
#[derive(Debug, Default)]
pub struct TerminationDetector {
    started: AtomicU64,
    finished: AtomicU64,
}

impl TerminationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` units of work as started. Call before enqueuing them.
    #[inline]
    pub fn started(&self, n: u64) {
        self.started.fetch_add(n, Ordering::SeqCst);
    }

    /// Record `n` units of work as finished. Call after the handler returns.
    #[inline]
    pub fn finished(&self, n: u64) {
        self.finished.fetch_add(n, Ordering::SeqCst);
    }

    /// Consistent quiescence check.
    ///
    /// Reads `started`, then `finished`, then `started` again; only an
    /// unchanged `started` equal to `finished` counts. This rules out the
    /// race where a unit starts between the two reads and would otherwise be
    /// reported as already drained.
    pub fn has_terminated(&self) -> bool {
        let s0 = self.started.load(Ordering::SeqCst);
        let f = self.finished.load(Ordering::SeqCst);
        let s1 = self.started.load(Ordering::SeqCst);
        s0 == s1 && s0 == f
    }

    /// Poll until quiescent, sleeping with exponential backoff between
    /// `min_backoff_ms` and `max_backoff_ms`.
    pub fn wait(&self, min_backoff_ms: u64, max_backoff_ms: u64) {
        let mut backoff = min_backoff_ms.max(1);
        while !self.has_terminated() {
            std::thread::sleep(Duration::from_millis(backoff));
            backoff = backoff.saturating_mul(2).min(max_backoff_ms.max(1));
        }
    }

    /// Current `(started, finished)` values; for diagnostics only.
    pub fn counts(&self) -> (u64, u64) {
        (
            self.started.load(Ordering::SeqCst),
            self.finished.load(Ordering::SeqCst),
        )
    }

    /// Reset both counters to zero. Only valid while no work is in flight.
    pub fn reset(&self) {
        self.started.store(0, Ordering::SeqCst);
        self.finished.store(0, Ordering::SeqCst);
    }
}
