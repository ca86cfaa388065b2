//! The locale-local work bag.
//!
//! One segment per worker thread plus two round-robin hints. Operations run
//! a two-phase acquisition: a best-case pass that only takes segments whose
//! status word is free right now, then an average-case pass that pins to
//! the hinted segment and waits. No FIFO/LIFO order is promised; this is a
//! bag, not a queue.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::segment::BagSegment;
use crate::config::EngineConfig;

pub struct Bag<W: Send> {
    segments: Box<[BagSegment<W>]>,
    start_idx_enq: AtomicUsize,
    start_idx_deq: AtomicUsize,
}

impl<W: Send> Bag<W> {
    pub fn new(n_segments: usize, initial_block_size: usize, max_block_size: usize) -> Self {
        let n = n_segments.max(1);
        let segments = (0..n)
            .map(|_| BagSegment::new(initial_block_size, max_block_size))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            segments,
            start_idx_enq: AtomicUsize::new(0),
            start_idx_deq: AtomicUsize::new(0),
        }
    }

    /// Segment count = worker parallelism, block sizes from the config.
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(cfg.task_par(), cfg.initial_block_size, cfg.max_block_size)
    }

    /// Total elements across segments; exact between operations.
    pub fn size(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }

    /// Insert one element.
    pub fn add(&self, w: W) {
        let n = self.segments.len();
        let start = self.start_idx_enq.fetch_add(1, Ordering::Relaxed) % n;
        // Best case: one sweep taking the first uncontended segment.
        let mut w = w;
        for i in 0..n {
            match self.segments[(start + i) % n].try_push(w) {
                Ok(()) => return,
                Err(back) => w = back,
            }
        }
        // Average case: pin to the hinted segment and wait it out.
        self.segments[start].push_pinned(w);
    }

    /// Bulk insert into the hinted segment under one acquisition.
    pub fn add_bulk(&self, ws: Vec<W>) {
        if ws.is_empty() {
            return;
        }
        let n = self.segments.len();
        let start = self.start_idx_enq.fetch_add(1, Ordering::Relaxed) % n;
        self.segments[start].extend(ws);
    }

    /// Remove some element, or `None` when every segment is empty.
    pub fn remove(&self) -> Option<W> {
        let n = self.segments.len();
        let start = self.start_idx_deq.fetch_add(1, Ordering::Relaxed) % n;
        // Best case: first segment that is non-empty and free right now.
        for i in 0..n {
            let seg = &self.segments[(start + i) % n];
            if seg.is_empty() {
                continue;
            }
            if let Some(got) = seg.try_pop() {
                if let Some(w) = got {
                    return Some(w);
                }
            }
        }
        // Average case: accept contended acquisitions.
        for i in 0..n {
            let seg = &self.segments[(start + i) % n];
            if seg.is_empty() {
                continue;
            }
            if let Some(w) = seg.pop_contended() {
                return Some(w);
            }
        }
        None
    }

    /// Bulk transfer out: up to `n` elements gathered across segments.
    pub fn take_batch(&self, n: usize) -> Vec<W> {
        let mut out = Vec::new();
        let segs = self.segments.len();
        let start = self.start_idx_deq.fetch_add(1, Ordering::Relaxed) % segs;
        for i in 0..segs {
            if out.len() >= n {
                break;
            }
            let seg = &self.segments[(start + i) % segs];
            if seg.is_empty() {
                continue;
            }
            out.extend(seg.take_batch(n - out.len()));
        }
        out
    }

    /// Read-only sweep over every queued element.
    pub fn for_each(&self, mut f: impl FnMut(&W)) {
        for seg in self.segments.iter() {
            seg.for_each(&mut f);
        }
    }
}
