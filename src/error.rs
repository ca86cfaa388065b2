//! HyperloomError: unified error type for hyperloom public APIs.
//!
//! Every fallible public operation in the crate returns this error type so
//! that callers get robust, non-panicking error handling across the whole
//! surface. Internal invariant violations (a bag block missing while its
//! element count is non-zero, a buffer drained on the wrong locale) are
//! bugs and are handled with debug assertions rather than error variants.

use thiserror::Error;

/// Unified error type for hyperloom operations.
#[derive(Debug, Error)]
pub enum HyperloomError {
    /// A vertex id outside the graph's vertex domain.
    #[error("vertex id {id} out of range (graph has {max} vertices)")]
    InvalidVertex { id: u64, max: u64 },
    /// An edge id outside the graph's edge domain.
    #[error("edge id {id} out of range (graph has {max} edges)")]
    InvalidEdge { id: u64, max: u64 },
    /// A generator ran out of edge-id space; dynamic growth is not supported.
    #[error("out of edges: edge id space exhausted")]
    OutOfEdges,
    /// A probability argument outside `[0, 1]`, or `1.0` under the
    /// coupon-collector correction (which would diverge).
    #[error("bad probability: {0}")]
    BadProbability(f64),
    /// A uniform draw fell outside the prefix-sum table's span.
    #[error("sample value {r} outside prefix-sum range [{low}, {high}]")]
    SampleOutOfRange { r: f64, low: f64, high: f64 },
    /// Degree sequences handed to a generator must be sorted ascending.
    #[error("degree sequence is not sorted ascending")]
    UnsortedDegrees,
    /// A degree sequence's length disagrees with the graph domain it drives.
    #[error("degree sequence of length {got} does not match domain of size {expected}")]
    DegreeLengthMismatch { expected: usize, got: usize },
    /// Work submitted to a work queue after `shutdown()`.
    #[error("work queue is shut down")]
    ShutdownQueue,
    /// A malformed line in an incidence CSV file.
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    /// The binary CSR stream ended before the advertised payload.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    /// A CSR offset table that is non-monotone or disagrees with the
    /// adjacency length.
    #[error("malformed CSR offsets: {0}")]
    MalformedOffsets(String),
    /// Underlying I/O failure, propagated from the reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HyperloomError>;
