//! # hyperloom
//!
//! hyperloom is a parallel, locale-sharded hypergraph engine for scientific
//! workloads: random hypergraph generation (Erdős–Rényi, Chung–Lu, BTER),
//! s-walk and breadth-first traversal, and butterfly/caterpillar analytics
//! over bipartite vertex/edge incidence structures.
//!
//! ## Features
//! - Adjacency-list incidence store with per-node spinlocks, lazy sorting,
//!   and lock-free degree reads
//! - Destination buffers that batch cross-locale inclusion writes into bulk
//!   appends, with an explicit flush barrier
//! - Work-stealing bags (per-worker unrolled-list segments) behind a
//!   multi-locale work queue with optional enqueue aggregation and pacing
//! - Termination detection for dynamically generated work
//! - Deterministic per-worker RNG streams, reproducible across runs
//! - Incidence CSV and binary CSR readers
//!
//! ## Usage
//! Add `hyperloom` as a dependency in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! hyperloom = "0.3"
//! ```
//!
//! Generate a small Erdős–Rényi hypergraph and count butterflies:
//!
//! ```rust
//! use hyperloom::prelude::*;
//!
//! let graph = AdjListHyperGraph::with_dims(64, 64);
//! erdos_renyi(&graph, 0.05, true, 42).unwrap();
//! graph.remove_duplicates();
//! let wings = graph.vertex_butterflies();
//! assert_eq!(wings.len(), 64);
//! ```
//!
//! ## Concurrency contract
//! Mutation is writer-parallel: any number of threads may insert inclusions
//! concurrently, buffered or direct. Analytic scans require a quiescent
//! graph; run them after [`AdjListHyperGraph::flush_buffers`] and outside
//! any insertion phase. The work queue promises bag semantics, not FIFO.

pub mod algs;
pub mod config;
pub mod error;
pub mod io;
pub mod runtime;
pub mod topology;
pub mod work;

pub use error::{HyperloomError, Result};

/// A convenient prelude importing the most-used types and operations.
pub mod prelude {
    pub use crate::algs::{
        bfs_vertices, bter, chung_lu, erdos_renyi, erdos_renyi_between, intersection,
        intersection_size, intersection_size_at_least, normalized_prefix, random_element,
        s_distance, UNREACHED,
    };
    pub use crate::config::{AggregationMode, EngineConfig};
    pub use crate::error::{HyperloomError, Result};
    pub use crate::io::{graph_from_csr, graph_from_incidence_csv};
    pub use crate::runtime::termination::TerminationDetector;
    pub use crate::runtime::{BlockDist, LocaleGroup, LocaleId};
    pub use crate::topology::{AdjListHyperGraph, EdgeId, VertexId};
    pub use crate::work::{work_loop, Bag, WorkQueue};
}
