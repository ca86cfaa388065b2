//! Destination buffers: batching for cross-locale inclusion writes.
//!
//! Hypergraph construction is dominated by small writes whose destination is
//! some other locale. Each locale owns one fixed-capacity buffer of pending
//! inclusion halves; producers reserve a slot with a fetch-add, write it,
//! and publish it by incrementing `filled` behind a release fence. The
//! producer whose publish fills the buffer drains it on the owning locale.
//!
//! A reservation index at or past capacity means the buffer is closed until
//! the drainer's `clear()`; the reserving producer spin-yields and retries.

use std::cell::UnsafeCell;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Which incidence array a buffered half-inclusion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionKind {
    /// Unwritten slot; skipped by the drainer.
    None,
    /// `src` is a vertex id, `dest` an edge id to append to it.
    Vertex,
    /// `src` is an edge id, `dest` a vertex id to append to it.
    Edge,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    src: u64,
    dest: u64,
    kind: InclusionKind,
}

const EMPTY_SLOT: Slot = Slot {
    src: 0,
    dest: 0,
    kind: InclusionKind::None,
};

/// Result of one buffered append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStatus {
    /// Slot claimed and published; buffer still has room.
    Ok,
    /// This append completed the buffer; the caller must drain it.
    Full,
}

/// Fixed-capacity batch of pending inclusion halves for one locale.
pub struct DestinationBuffer {
    slots: Box<[UnsafeCell<Slot>]>,
    /// Next slot to claim; may transiently exceed capacity under races.
    size: AtomicUsize,
    /// Slots actually written; `filled == capacity` means ready to drain.
    filled: AtomicUsize,
}

// Slots are written exactly once per claim and read only by the drainer,
// which runs after the publishing fence.
unsafe impl Sync for DestinationBuffer {}
unsafe impl Send for DestinationBuffer {}

impl DestinationBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "destination buffer capacity must be non-zero");
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(EMPTY_SLOT))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            size: AtomicUsize::new(0),
            filled: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim a slot, write the half-inclusion, publish it.
    ///
    /// Returns [`AppendStatus::Full`] to exactly one caller: the one whose
    /// publish brought `filled` to capacity. That caller is responsible for
    /// draining and clearing the buffer before anyone can make progress.
    pub fn append(&self, src: u64, dest: u64, kind: InclusionKind) -> AppendStatus {
        debug_assert!(kind != InclusionKind::None);
        let cap = self.capacity();
        loop {
            let idx = self.size.fetch_add(1, Ordering::Relaxed);
            if idx >= cap {
                // Closed until the drainer resets `size`.
                while self.size.load(Ordering::Relaxed) >= cap {
                    std::thread::yield_now();
                }
                continue;
            }
            unsafe {
                *self.slots[idx].get() = Slot { src, dest, kind };
            }
            // The slot contents must be visible before the publish below.
            fence(Ordering::Release);
            let filled = self.filled.fetch_add(1, Ordering::AcqRel) + 1;
            debug_assert!(filled <= cap);
            return if filled == cap {
                AppendStatus::Full
            } else {
                AppendStatus::Ok
            };
        }
    }

    /// Visit every written slot. Unwritten (`None`) slots are skipped: a
    /// partially filled buffer drained at a flush barrier has holes.
    ///
    /// Caller contract: either this append returned `Full` (the buffer is
    /// closed, all slots published) or all producers are quiescent.
    pub fn for_each_filled(&self, mut f: impl FnMut(u64, u64, InclusionKind)) {
        fence(Ordering::Acquire);
        let written = self.filled.load(Ordering::Acquire).min(self.capacity());
        let mut seen = 0;
        for cell in self.slots.iter() {
            if seen == written {
                break;
            }
            let slot = unsafe { *cell.get() };
            if slot.kind != InclusionKind::None {
                seen += 1;
                f(slot.src, slot.dest, slot.kind);
            }
        }
    }

    /// Reset the buffer: every slot back to `None`, both counters to zero.
    ///
    /// `size` is reset last; it is the gate blocked producers spin on.
    pub fn clear(&self) {
        for cell in self.slots.iter() {
            unsafe {
                *cell.get() = EMPTY_SLOT;
            }
        }
        self.filled.store(0, Ordering::Release);
        self.size.store(0, Ordering::Release);
    }

    /// Written-slot count; `filled <= capacity` always holds.
    pub fn filled(&self) -> usize {
        self.filled.load(Ordering::Acquire)
    }

    /// True when no slot has been claimed since the last clear.
    pub fn is_empty(&self) -> bool {
        self.filled() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fill_exactly_once_reports_full() {
        let buf = DestinationBuffer::new(4);
        assert_eq!(buf.append(0, 1, InclusionKind::Vertex), AppendStatus::Ok);
        assert_eq!(buf.append(1, 2, InclusionKind::Edge), AppendStatus::Ok);
        assert_eq!(buf.append(2, 3, InclusionKind::Vertex), AppendStatus::Ok);
        assert_eq!(buf.append(3, 4, InclusionKind::Edge), AppendStatus::Full);
        assert_eq!(buf.filled(), 4);

        let mut drained = Vec::new();
        buf.for_each_filled(|s, d, k| drained.push((s, d, k)));
        assert_eq!(drained.len(), 4);

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.append(9, 9, InclusionKind::Vertex), AppendStatus::Ok);
    }

    #[test]
    fn concurrent_appends_publish_every_slot() {
        let cap = 1024;
        let buf = Arc::new(DestinationBuffer::new(cap));
        let full_seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let buf = buf.clone();
            let full_seen = full_seen.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..(cap as u64 / 4) {
                    let status = buf.append(t, i, InclusionKind::Vertex);
                    if status == AppendStatus::Full {
                        full_seen.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(full_seen.load(Ordering::SeqCst), 1);
        assert_eq!(buf.filled(), cap);
        let mut count = 0;
        buf.for_each_filled(|_, _, _| count += 1);
        assert_eq!(count, cap);
    }

    #[test]
    fn partial_drain_skips_holes() {
        let buf = DestinationBuffer::new(8);
        buf.append(1, 10, InclusionKind::Vertex);
        buf.append(2, 20, InclusionKind::Edge);
        let mut drained = Vec::new();
        buf.for_each_filled(|s, d, _| drained.push((s, d)));
        assert_eq!(drained, vec![(1, 10), (2, 20)]);
        buf.clear();
        assert_eq!(buf.filled(), 0);
    }
}
