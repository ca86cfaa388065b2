//! Per-worker bag segment: an unrolled list guarded by a status word.
//!
//! The status word is a tiny state machine (`Unlocked`, `Add`, `Remove`,
//! `Lookup`) acquired with a single compare-exchange. A worker operating on
//! its own segment wins the exchange essentially always; the word is only
//! contended on cross-worker steals. The element count is maintained
//! outside the critical section so emptiness checks never acquire.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use super::block::BlockList;

/// Ownership state of a segment's status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SegmentStatus {
    Unlocked = 0,
    /// Held by an enqueueing operation.
    Add = 1,
    /// Held by a dequeueing operation.
    Remove = 2,
    /// Held by a read-only sweep.
    Lookup = 3,
}

pub(crate) struct BagSegment<W> {
    status: AtomicU32,
    n_elems: AtomicUsize,
    list: UnsafeCell<BlockList<W>>,
}

// The status word serializes all access to `list`.
unsafe impl<W: Send> Send for BagSegment<W> {}
unsafe impl<W: Send> Sync for BagSegment<W> {}

impl<W: Send> BagSegment<W> {
    pub(crate) fn new(initial_block_size: usize, max_block_size: usize) -> Self {
        Self {
            status: AtomicU32::new(SegmentStatus::Unlocked as u32),
            n_elems: AtomicUsize::new(0),
            list: UnsafeCell::new(BlockList::new(initial_block_size, max_block_size)),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.n_elems.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn try_acquire(&self, state: SegmentStatus) -> bool {
        self.status
            .compare_exchange(
                SegmentStatus::Unlocked as u32,
                state as u32,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Acquire regardless of contention, yielding between observations.
    fn acquire(&self, state: SegmentStatus) {
        loop {
            if self.try_acquire(state) {
                return;
            }
            while self.status.load(Ordering::Relaxed) != SegmentStatus::Unlocked as u32 {
                std::thread::yield_now();
            }
        }
    }

    #[inline]
    fn release(&self) {
        self.status
            .store(SegmentStatus::Unlocked as u32, Ordering::Release);
    }

    /// Best-case push: succeeds only if the word is free right now.
    pub(crate) fn try_push(&self, w: W) -> Result<(), W> {
        if !self.try_acquire(SegmentStatus::Add) {
            return Err(w);
        }
        unsafe { (*self.list.get()).push(w) };
        self.n_elems.fetch_add(1, Ordering::Release);
        self.release();
        Ok(())
    }

    /// Average-case push: pins to this segment and waits its turn.
    pub(crate) fn push_pinned(&self, w: W) {
        self.acquire(SegmentStatus::Add);
        unsafe { (*self.list.get()).push(w) };
        self.n_elems.fetch_add(1, Ordering::Release);
        self.release();
    }

    /// Bulk append under one acquisition.
    pub(crate) fn extend(&self, ws: Vec<W>) {
        if ws.is_empty() {
            return;
        }
        let n = ws.len();
        self.acquire(SegmentStatus::Add);
        {
            let list = unsafe { &mut *self.list.get() };
            for w in ws {
                list.push(w);
            }
        }
        self.n_elems.fetch_add(n, Ordering::Release);
        self.release();
    }

    /// Best-case pop: `None` when the word is contended, `Some(None)` when
    /// the segment turned out empty under the lock.
    pub(crate) fn try_pop(&self) -> Option<Option<W>> {
        if !self.try_acquire(SegmentStatus::Remove) {
            return None;
        }
        let w = unsafe { (*self.list.get()).pop() };
        if w.is_some() {
            self.n_elems.fetch_sub(1, Ordering::Release);
        }
        self.release();
        Some(w)
    }

    /// Average-case pop: waits out contention.
    pub(crate) fn pop_contended(&self) -> Option<W> {
        self.acquire(SegmentStatus::Remove);
        let w = unsafe { (*self.list.get()).pop() };
        if w.is_some() {
            self.n_elems.fetch_sub(1, Ordering::Release);
        }
        self.release();
        w
    }

    /// Bulk transfer out of the head blocks; the count is adjusted once.
    pub(crate) fn take_batch(&self, n: usize) -> Vec<W> {
        self.acquire(SegmentStatus::Remove);
        let out = unsafe { (*self.list.get()).take_batch(n) };
        if !out.is_empty() {
            self.n_elems.fetch_sub(out.len(), Ordering::Release);
        }
        self.release();
        out
    }

    /// Read-only sweep under the `Lookup` state.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&W)) {
        self.acquire(SegmentStatus::Lookup);
        {
            let n = self.n_elems.load(Ordering::Acquire);
            let list = unsafe { &mut *self.list.get() };
            // Drain-and-restore keeps BlockList free of iteration plumbing.
            let mut items = list.take_batch(n);
            for w in &items {
                f(w);
            }
            items.reverse();
            for w in items {
                list.push(w);
            }
        }
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn push_pop_maintain_count() {
        let seg: BagSegment<u64> = BagSegment::new(4, 16);
        assert!(seg.is_empty());
        seg.push_pinned(1);
        seg.try_push(2).unwrap();
        assert_eq!(seg.len(), 2);
        assert!(seg.try_pop().unwrap().is_some());
        assert!(seg.pop_contended().is_some());
        assert_eq!(seg.pop_contended(), None);
        assert!(seg.is_empty());
    }

    #[test]
    fn lookup_observes_without_consuming() {
        let seg: BagSegment<u64> = BagSegment::new(2, 8);
        for i in 0..5 {
            seg.push_pinned(i);
        }
        let mut seen = Vec::new();
        seg.for_each(|w| seen.push(*w));
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(seg.len(), 5);
        let mut drained = Vec::new();
        while let Some(w) = seg.pop_contended() {
            drained.push(w);
        }
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_producers_consumers_balance() {
        let seg: Arc<BagSegment<u64>> = Arc::new(BagSegment::new(8, 64));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let seg = seg.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..1_000 {
                    seg.push_pinned(t * 1_000 + i);
                }
            }));
        }
        let consumed = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let seg = seg.clone();
            let consumed = consumed.clone();
            handles.push(std::thread::spawn(move || loop {
                if seg.pop_contended().is_some() {
                    consumed.fetch_add(1, Ordering::SeqCst);
                } else if consumed.load(Ordering::SeqCst) == 4_000 {
                    break;
                } else {
                    std::thread::yield_now();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(consumed.load(Ordering::SeqCst), 4_000);
        assert!(seg.is_empty());
    }
}
