//! Locales: logical memory shards with a worker-thread budget.
//!
//! The engine runs single-process; a locale is the unit of data ownership
//! and the scope of one work bag, one destination buffer, and one pool of
//! workers. Every distributed object is block-partitioned over the locale
//! set, and "run this on locale L" becomes a closure executed with the
//! ambient-locale thread-local set to L. Shared memory makes the transfer
//! itself free; the API boundary keeps ownership honest at every call site.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::ops::Range;

/// Identifier of a compute locale, `0..n_locales`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct LocaleId(usize);

impl LocaleId {
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Debug for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocaleId").field(&self.0).finish()
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

thread_local! {
    /// Ambient locale of the current thread; locale 0 outside `on_locale`.
    static HERE: Cell<usize> = const { Cell::new(0) };
}

/// The process-wide set of locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleGroup {
    n_locales: usize,
    max_task_par: usize,
}

impl LocaleGroup {
    /// A group of `n_locales` shards with `max_task_par` workers each.
    pub fn new(n_locales: usize, max_task_par: Option<usize>) -> Self {
        let mtp = max_task_par.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        Self {
            n_locales: n_locales.max(1),
            max_task_par: mtp.max(1),
        }
    }

    /// The degenerate single-locale group.
    pub fn single() -> Self {
        Self::new(1, None)
    }

    pub fn from_config(cfg: &crate::config::EngineConfig) -> Self {
        Self::new(cfg.n_locales, cfg.max_task_par)
    }

    #[inline]
    pub fn n_locales(&self) -> usize {
        self.n_locales
    }

    #[inline]
    pub fn max_task_par(&self) -> usize {
        self.max_task_par
    }

    pub fn locales(&self) -> impl Iterator<Item = LocaleId> {
        (0..self.n_locales).map(LocaleId::new)
    }

    /// The ambient locale of the calling thread.
    #[inline]
    pub fn here() -> LocaleId {
        LocaleId::new(HERE.with(|h| h.get()))
    }

    /// Run `f` in the context of locale `loc`: the ambient locale is set for
    /// the duration of the call and restored afterwards.
    pub fn on_locale<R>(&self, loc: LocaleId, f: impl FnOnce() -> R) -> R {
        debug_assert!(loc.get() < self.n_locales);
        HERE.with(|h| {
            let prev = h.replace(loc.get());
            let out = f();
            h.set(prev);
            out
        })
    }

    /// Run `f(loc)` once per locale, in parallel.
    pub fn for_each_locale<F>(&self, f: F)
    where
        F: Fn(LocaleId) + Sync,
    {
        use rayon::prelude::*;
        (0..self.n_locales).into_par_iter().for_each(|i| {
            let loc = LocaleId::new(i);
            HERE.with(|h| {
                let prev = h.replace(i);
                f(loc);
                h.set(prev);
            });
        });
    }
}

/// Contiguous block distribution of `0..len` ids over a locale set.
///
/// Locale `l` owns `[l*len/L, (l+1)*len/L)`; ranges are contiguous, cover
/// the domain, and differ in size by at most one block quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDist {
    len: usize,
    n_locales: usize,
}

impl BlockDist {
    pub fn new(len: usize, n_locales: usize) -> Self {
        Self {
            len,
            n_locales: n_locales.max(1),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn n_locales(&self) -> usize {
        self.n_locales
    }

    /// Owning locale of id `i`. Inverse of [`BlockDist::local_range`].
    #[inline]
    pub fn owner(&self, i: usize) -> LocaleId {
        debug_assert!(i < self.len, "id {i} outside domain of {}", self.len);
        if self.len == 0 {
            return LocaleId::new(0);
        }
        LocaleId::new(((i + 1) * self.n_locales - 1) / self.len)
    }

    /// The contiguous id range owned by locale `loc`.
    #[inline]
    pub fn local_range(&self, loc: LocaleId) -> Range<usize> {
        let l = loc.get();
        debug_assert!(l < self.n_locales);
        (l * self.len / self.n_locales)..((l + 1) * self.len / self.n_locales)
    }
}
