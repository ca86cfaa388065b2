//! Distributed work queue: one bag per locale, aggregated remote enqueues,
//! and the canonical consumer loop.
//!
//! Remote `add_work` calls can be batched per `(source, destination)` pair;
//! a full batch is handed to an asynchronous transport task that
//! bulk-appends on the destination. In-flight transports are tracked by a
//! dedicated termination detector so consumers can distinguish "no work
//! yet" from "no work ever again". A pacing watcher flushes local batches
//! when bag velocity drops below the configured floor, so small tails of
//! work never sit stranded in aggregation buffers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::bag::Bag;
use crate::config::{AggregationMode, EngineConfig};
use crate::error::{HyperloomError, Result};
use crate::runtime::locale::{LocaleGroup, LocaleId};
use crate::runtime::termination::TerminationDetector;

const DYNAMIC_INITIAL_THRESHOLD: usize = 64;
const DYNAMIC_MAX_THRESHOLD: usize = 1 << 16;

struct AggBuffer<W> {
    buf: Mutex<Vec<W>>,
    threshold: std::sync::atomic::AtomicUsize,
}

impl<W> AggBuffer<W> {
    fn new(threshold: usize) -> Self {
        Self {
            buf: Mutex::new(Vec::new()),
            threshold: std::sync::atomic::AtomicUsize::new(threshold.max(1)),
        }
    }
}

struct QueueInner<W: Send> {
    group: LocaleGroup,
    bags: Box<[Bag<W>]>,
    /// Row-major `(source, destination)` aggregation buffers, if enabled.
    aggs: Option<Box<[AggBuffer<W>]>>,
    dynamic: bool,
    async_tasks: TerminationDetector,
    shutdown: Box<[AtomicBool]>,
    min_flush_velocity: f64,
}

/// Multi-locale work queue facade. Cheap to clone; clones share state.
pub struct WorkQueue<W: Send + 'static> {
    inner: Arc<QueueInner<W>>,
}

impl<W: Send + 'static> Clone for WorkQueue<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: Send + 'static> WorkQueue<W> {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self::for_group(LocaleGroup::from_config(cfg), cfg)
    }

    /// Build over an existing locale group (e.g. a graph's), taking only
    /// sizing knobs from `cfg`.
    pub fn for_group(group: LocaleGroup, cfg: &EngineConfig) -> Self {
        let n = group.n_locales();
        let bags = (0..n)
            .map(|_| Bag::new(group.max_task_par(), cfg.initial_block_size, cfg.max_block_size))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let (aggs, dynamic) = match cfg.aggregation {
            AggregationMode::None => (None, false),
            AggregationMode::Static(cap) => (
                Some(
                    (0..n * n)
                        .map(|_| AggBuffer::new(cap))
                        .collect::<Vec<_>>()
                        .into_boxed_slice(),
                ),
                false,
            ),
            AggregationMode::Dynamic => (
                Some(
                    (0..n * n)
                        .map(|_| AggBuffer::new(DYNAMIC_INITIAL_THRESHOLD))
                        .collect::<Vec<_>>()
                        .into_boxed_slice(),
                ),
                true,
            ),
        };
        let shutdown = (0..n)
            .map(|_| AtomicBool::new(false))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            inner: Arc::new(QueueInner {
                group,
                bags,
                aggs,
                dynamic,
                async_tasks: TerminationDetector::new(),
                shutdown,
                min_flush_velocity: cfg.min_flush_velocity,
            }),
        }
    }

    pub fn group(&self) -> &LocaleGroup {
        &self.inner.group
    }

    /// Submit `w` for execution on locale `dst`.
    ///
    /// Local submissions go straight into the local bag. Remote submissions
    /// batch per destination when aggregation is configured; a filled batch
    /// is carried by an asynchronous transport task.
    pub fn add_work(&self, w: W, dst: LocaleId) -> Result<()> {
        let here = LocaleGroup::here();
        if self.is_shutdown() {
            return Err(HyperloomError::ShutdownQueue);
        }
        debug_assert!(dst.get() < self.inner.group.n_locales());

        if dst == here {
            self.inner.bags[dst.get()].add(w);
            return Ok(());
        }
        let Some(aggs) = self.inner.aggs.as_ref() else {
            self.inner.bags[dst.get()].add(w);
            return Ok(());
        };

        let agg = &aggs[here.get() * self.inner.group.n_locales() + dst.get()];
        let batch = {
            let mut buf = agg.buf.lock();
            buf.push(w);
            if buf.len() >= agg.threshold.load(Ordering::Relaxed) {
                Some(std::mem::take(&mut *buf))
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            if self.inner.dynamic {
                let t = agg.threshold.load(Ordering::Relaxed);
                agg.threshold
                    .store((t * 2).min(DYNAMIC_MAX_THRESHOLD), Ordering::Relaxed);
            }
            self.transport(dst, batch);
        }
        Ok(())
    }

    /// Hand a batch to an asynchronous transport task that delivers it on
    /// the destination locale.
    fn transport(&self, dst: LocaleId, batch: Vec<W>) {
        self.inner.async_tasks.started(1);
        let inner = self.inner.clone();
        rayon::spawn(move || {
            inner
                .group
                .on_locale(dst, || inner.bags[dst.get()].add_bulk(batch));
            inner.async_tasks.finished(1);
        });
    }

    /// Non-blocking dequeue from the calling locale's bag.
    pub fn get_work(&self) -> Option<W> {
        self.inner.bags[LocaleGroup::here().get()].remove()
    }

    /// Elements currently queued on the calling locale.
    pub fn local_size(&self) -> usize {
        self.inner.bags[LocaleGroup::here().get()].size()
    }

    /// Deliver every batch aggregated on the calling locale, synchronously.
    pub fn flush_local(&self) {
        let Some(aggs) = self.inner.aggs.as_ref() else {
            return;
        };
        let here = LocaleGroup::here();
        let n = self.inner.group.n_locales();
        for dst in 0..n {
            let agg = &aggs[here.get() * n + dst];
            let batch = std::mem::take(&mut *agg.buf.lock());
            if self.inner.dynamic {
                agg.threshold
                    .store(DYNAMIC_INITIAL_THRESHOLD, Ordering::Relaxed);
            }
            if !batch.is_empty() {
                self.inner
                    .group
                    .on_locale(LocaleId::new(dst), || self.inner.bags[dst].add_bulk(batch));
            }
        }
    }

    /// Flush every locale's aggregation buffers and wait for in-flight
    /// transports to land.
    pub fn flush(&self) {
        self.inner.group.for_each_locale(|_| self.flush_local());
        self.inner.async_tasks.wait(1, 8);
    }

    /// Forbid future submissions on every locale. Work already dequeued by
    /// a consumer runs to completion; items still sitting in the bags or
    /// aggregation buffers when the flag lands may never be delivered.
    pub fn shutdown(&self) {
        for flag in self.inner.shutdown.iter() {
            flag.store(true, Ordering::Release);
        }
    }

    /// Shutdown flag of the calling locale.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown[LocaleGroup::here().get()].load(Ordering::Acquire)
    }

    /// True when no transport task is in flight.
    pub fn async_terminated(&self) -> bool {
        self.inner.async_tasks.has_terminated()
    }

    /// Pacing watcher body: once per millisecond, compare the local bag's
    /// growth against the velocity floor and flush stranded batches.
    fn watch(&self, td: &TerminationDetector) {
        let mut last = self.local_size();
        loop {
            if self.is_shutdown() || (self.async_terminated() && td.has_terminated()) {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
            let now = self.local_size();
            let velocity = now as f64 - last as f64;
            last = now;
            if velocity < self.inner.min_flush_velocity && self.has_pending_batches() {
                log::debug!(
                    "locale {}: bag velocity {velocity:.2}/ms below floor, flushing batches",
                    LocaleGroup::here()
                );
                self.flush_local();
            }
        }
    }

    fn has_pending_batches(&self) -> bool {
        let Some(aggs) = self.inner.aggs.as_ref() else {
            return false;
        };
        let here = LocaleGroup::here();
        let n = self.inner.group.n_locales();
        (0..n).any(|dst| !aggs[here.get() * n + dst].buf.lock().is_empty())
    }
}

/// Canonical consumer: per locale, spawn `max_task_par` workers plus one
/// pacing watcher. Each worker repeatedly dequeues and runs `handler`,
/// yielding while empty, and exits once the queue is shut down or both the
/// transport detector and `td` are quiescent.
///
/// `handler` owns the termination protocol: callers seed `td.started(n)`
/// before the first `add_work`, and the handler must mark derived work
/// started before enqueueing it and its own unit finished on return.
pub fn work_loop<W, F>(wq: &WorkQueue<W>, td: &TerminationDetector, handler: F)
where
    W: Send + 'static,
    F: Fn(W) + Sync,
{
    let group = *wq.group();
    let handler = &handler;
    std::thread::scope(|s| {
        for loc in group.locales() {
            for _ in 0..group.max_task_par() {
                let wq = wq.clone();
                s.spawn(move || {
                    group.on_locale(loc, || loop {
                        if wq.is_shutdown() {
                            return;
                        }
                        match wq.get_work() {
                            Some(w) => handler(w),
                            None => {
                                if wq.async_terminated() && td.has_terminated() {
                                    return;
                                }
                                std::thread::yield_now();
                            }
                        }
                    })
                });
            }
            let wq = wq.clone();
            s.spawn(move || group.on_locale(loc, || wq.watch(td)));
        }
    });
}
