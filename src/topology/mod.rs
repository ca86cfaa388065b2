//! Incidence topology: descriptors, per-node adjacency records, destination
//! buffers, and the hypergraph store itself.

pub mod buffer;
pub mod descriptor;
pub mod hypergraph;
pub mod node_data;

pub use buffer::{AppendStatus, DestinationBuffer, InclusionKind};
pub use descriptor::{EdgeId, VertexId};
pub use hypergraph::{AdjListHyperGraph, LocaleHandle};
pub use node_data::NodeData;
