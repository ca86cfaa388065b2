//! Per-node incidence record: a locked, lazily sorted adjacency list.
//!
//! One `NodeData` exists for every vertex and every hyperedge. Updates are
//! dominated by appends, so the list stays unsorted until the first
//! membership query, which sorts it in place under the lock. The length
//! lives in a separate atomic so degree queries never touch the lock.
//!
//! Concurrency contract: appends are safe against other appends on the same
//! node; they are not safe against concurrent readers. Analytic scans must
//! run in a quiescent phase (after `flush_buffers`) or take snapshots.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::runtime::spinlock::SpinLock;

struct NeighborList<T> {
    neighbors: Vec<T>,
    is_sorted: bool,
}

/// The incidence list of a single vertex or edge.
///
/// `T` is the descriptor type of the *other* side: vertices store `EdgeId`
/// neighbors and edges store `VertexId` neighbors.
pub struct NodeData<T> {
    lock: SpinLock,
    inner: UnsafeCell<NeighborList<T>>,
    len: AtomicUsize,
}

// The spinlock serializes every access to `inner`.
unsafe impl<T: Send> Send for NodeData<T> {}
unsafe impl<T: Send> Sync for NodeData<T> {}

impl<T: Copy + Ord> NodeData<T> {
    pub fn new() -> Self {
        Self {
            lock: SpinLock::new(),
            inner: UnsafeCell::new(NeighborList {
                neighbors: Vec::new(),
                is_sorted: true,
            }),
            len: AtomicUsize::new(0),
        }
    }

    /// Append a single neighbor.
    pub fn add_neighbor(&self, n: T) {
        let _g = self.lock.lock();
        let list = unsafe { &mut *self.inner.get() };
        list.neighbors.push(n);
        list.is_sorted = false;
        self.len.store(list.neighbors.len(), Ordering::Release);
    }

    /// Append a batch of neighbors under one lock acquisition.
    pub fn add_neighbors<I>(&self, ns: I)
    where
        I: IntoIterator<Item = T>,
    {
        let _g = self.lock.lock();
        let list = unsafe { &mut *self.inner.get() };
        list.neighbors.extend(ns);
        list.is_sorted = false;
        self.len.store(list.neighbors.len(), Ordering::Release);
    }

    /// Membership query; sorts lazily on first use after an append.
    pub fn has_neighbor(&self, n: &T) -> bool {
        let _g = self.lock.lock();
        let list = unsafe { &mut *self.inner.get() };
        if !list.is_sorted {
            list.neighbors.sort_unstable();
            list.is_sorted = true;
        }
        list.neighbors.binary_search(n).is_ok()
    }

    /// Lock-free degree read; exact even while writers hold the lock.
    #[inline]
    pub fn num_neighbors(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Sort and collapse duplicate neighbors; returns how many were removed.
    pub fn sort_and_dedup(&self) -> usize {
        let _g = self.lock.lock();
        let list = unsafe { &mut *self.inner.get() };
        let before = list.neighbors.len();
        list.neighbors.sort_unstable();
        list.neighbors.dedup();
        list.is_sorted = true;
        self.len.store(list.neighbors.len(), Ordering::Release);
        before - list.neighbors.len()
    }

    /// Clone the neighbor list in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        let _g = self.lock.lock();
        let list = unsafe { &*self.inner.get() };
        list.neighbors.clone()
    }

    /// Clone the neighbor list sorted ascending, marking it sorted as a side
    /// effect so later membership queries skip the sort.
    pub fn sorted_snapshot(&self) -> Vec<T> {
        let _g = self.lock.lock();
        let list = unsafe { &mut *self.inner.get() };
        if !list.is_sorted {
            list.neighbors.sort_unstable();
            list.is_sorted = true;
        }
        list.neighbors.clone()
    }

    /// Run `f` over the neighbor slice while holding the lock.
    pub fn with_neighbors<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let _g = self.lock.lock();
        let list = unsafe { &*self.inner.get() };
        f(&list.neighbors)
    }

    /// Times an append or query hit lock contention on this node.
    pub fn contention_count(&self) -> u64 {
        self.lock.contention_count()
    }
}

impl<T: Copy + Ord> Default for NodeData<T> {
    fn default() -> Self {
        Self::new()
    }
}
