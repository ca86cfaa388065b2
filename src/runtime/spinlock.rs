//! Test-and-test-and-set spinlock with cooperative yielding.
//!
//! The lock word lives inline next to whatever it protects, so acquiring it
//! touches the same cache line as the payload. The fast path is a single
//! compare-exchange; the slow path read-spins on the flag with a doubling
//! tight-spin budget and yields to the scheduler between observed-held
//! states. A contention counter records fast-path failures.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{MAX_TIGHT_SPINS, MIN_TIGHT_SPINS};

/// A one-word spinlock guarding an adjacent payload.
///
/// The lock does not own data; callers pair it with an `UnsafeCell` and use
/// the returned [`SpinGuard`] to scope the critical section.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
    contended: AtomicU64,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            contended: AtomicU64::new(0),
        }
    }

    /// Acquire the lock, spinning and yielding as needed.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return SpinGuard { lock: self };
        }
        self.contended.fetch_add(1, Ordering::Relaxed);
        self.lock_slow()
    }

    #[cold]
    fn lock_slow(&self) -> SpinGuard<'_> {
        let mut budget = MIN_TIGHT_SPINS;
        loop {
            let mut spins = 0;
            while self.locked.load(Ordering::Relaxed) {
                spins += 1;
                if spins >= budget {
                    std::thread::yield_now();
                    budget = (budget * 2).min(MAX_TIGHT_SPINS);
                    spins = 0;
                } else {
                    std::hint::spin_loop();
                }
            }
            if self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinGuard { lock: self };
            }
        }
    }

    /// Single-attempt acquisition.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinGuard { lock: self })
    }

    /// Number of times the fast path failed since construction.
    pub fn contention_count(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}

/// RAII guard; dropping it releases the lock with a plain release store.
#[must_use]
pub struct SpinGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
