//! Engine tunables.
//!
//! One plain configuration struct covers the knobs the engine exposes:
//! locale/worker counts, destination-buffer capacity, unrolled-block sizes
//! for the work bags, aggregation mode for cross-locale enqueues, and the
//! pacing threshold of the starvation watcher. Tests shrink the buffer and
//! block sizes to exercise the overflow/growth paths cheaply.

use serde::{Deserialize, Serialize};

/// How `WorkQueue::add_work` treats enqueues destined for a remote locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMode {
    /// Append directly into the destination locale's bag.
    None,
    /// Batch into a fixed-capacity per-destination buffer; a full buffer is
    /// handed to an asynchronous transport task.
    Static(usize),
    /// Like `Static`, but the per-destination threshold adapts: it doubles
    /// each time a buffer fills and resets on an explicit flush.
    Dynamic,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of logical locales (memory shards) the engine runs with.
    pub n_locales: usize,
    /// Worker threads per locale; `None` means available parallelism.
    pub max_task_par: Option<usize>,
    /// Capacity of each locale's destination buffer, in inclusion halves.
    pub dest_buffer_capacity: usize,
    /// Capacity of the first block in each bag segment.
    pub initial_block_size: usize,
    /// Ceiling for geometric block growth in bag segments.
    pub max_block_size: usize,
    /// Remote-enqueue batching policy for work queues.
    pub aggregation: AggregationMode,
    /// Items-per-millisecond floor below which the pacing watcher flushes
    /// local aggregation buffers.
    pub min_flush_velocity: f64,
    /// Base seed for all deterministic per-worker RNG streams.
    pub rng_seed: u64,
    /// Tolerated relative deviation between the observed Chung–Lu duplicate
    /// count and its i.i.d.-sampling expectation; used by verification
    /// tooling, not by the generator itself.
    pub chung_lu_duplication_variance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_locales: 1,
            max_task_par: None,
            dest_buffer_capacity: 1 << 20,
            initial_block_size: 1024,
            max_block_size: 1 << 20,
            aggregation: AggregationMode::None,
            min_flush_velocity: 0.1,
            rng_seed: 42,
            chung_lu_duplication_variance: 0.33,
        }
    }
}

impl EngineConfig {
    /// Resolve `max_task_par` against the machine.
    pub fn task_par(&self) -> usize {
        self.max_task_par.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Tight-spin budget before the first cooperative yield in spin loops.
pub const MIN_TIGHT_SPINS: u32 = 8;
/// Ceiling for the doubling tight-spin budget between yields.
pub const MAX_TIGHT_SPINS: u32 = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.dest_buffer_capacity, 1 << 20);
        assert_eq!(cfg.initial_block_size, 1024);
        assert_eq!(cfg.max_block_size, 1 << 20);
        assert_eq!(cfg.aggregation, AggregationMode::None);
        assert!(cfg.task_par() >= 1);
    }
}
