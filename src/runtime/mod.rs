//! Execution substrate: locales, spinlocks, RNG streams, termination.

pub mod locale;
pub mod registry;
pub mod spinlock;
pub mod stream;
pub mod termination;

pub use locale::{BlockDist, LocaleGroup, LocaleId};
pub use spinlock::{SpinGuard, SpinLock};
pub use termination::TerminationDetector;
