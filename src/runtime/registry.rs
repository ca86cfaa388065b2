//! Privatization registry.
//!
//! A privatized object is replicated once per locale under a shared id so
//! hot-path access never leaves the locale. The registry is the process-wide
//! map from privatization id to the per-locale handle table; it is
//! initialized on first registration and entries are torn down when the
//! owning object drops.

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::locale::LocaleId;

/// Shared identifier of one privatized object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PrivatizationId(u64);

impl PrivatizationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

type HandleTable = Vec<Arc<dyn Any + Send + Sync>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static REGISTRY: Lazy<RwLock<HashMap<u64, HandleTable>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register one handle per locale; returns the shared id.
pub fn register<T: Send + Sync + 'static>(handles: Vec<Arc<T>>) -> PrivatizationId {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let table: HandleTable = handles
        .into_iter()
        .map(|h| h as Arc<dyn Any + Send + Sync>)
        .collect();
    REGISTRY.write().insert(id, table);
    PrivatizationId(id)
}

/// Look up locale `loc`'s handle for `pid`, downcast to its concrete type.
pub fn lookup<T: Send + Sync + 'static>(
    pid: PrivatizationId,
    loc: LocaleId,
) -> Option<Arc<T>> {
    let guard = REGISTRY.read();
    let table = guard.get(&pid.0)?;
    let handle = table.get(loc.get())?.clone();
    handle.downcast::<T>().ok()
}

/// Drop every handle registered under `pid`.
pub fn unregister(pid: PrivatizationId) {
    REGISTRY.write().remove(&pid.0);
}
