//! Work distribution: unrolled-list bags and the multi-locale work queue.

mod block;
mod segment;

pub mod bag;
pub mod queue;

pub use bag::Bag;
pub use queue::{work_loop, WorkQueue};
pub use segment::SegmentStatus;
