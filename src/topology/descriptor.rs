//! `VertexId` / `EdgeId`: strong, zero-cost handles for incidence endpoints.
//!
//! A hypergraph has two independent id spaces, both starting at 0. Wrapping
//! each in its own newtype makes a swapped `(vertex, edge)` argument pair a
//! compile error instead of a silently corrupted graph, while keeping the
//! in-memory representation a bare `u64`.
//!
//! This module provides:
//! - Transparent newtypes with the same ABI and alignment as `u64`.
//! - Infallible conversions to and from raw integers.
//! - Common trait implementations (`Debug`, `Display`, ordering, hashing,
//!   serde) so descriptors can live in maps, sets, and wire formats.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor of a vertex; convertible to and from its raw id.
///
/// # Memory layout
/// `repr(transparent)` over `u64`: descriptors can be stored in flat arrays
/// and cast in bulk exactly like raw ids.
///
/// ```rust
/// # use hyperloom::topology::descriptor::VertexId;
/// let v = VertexId::new(3);
/// assert_eq!(u64::from(v), 3);
/// assert_eq!(VertexId::from(3u64), v);
/// ```
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct VertexId(u64);

/// Descriptor of a hyperedge; deliberately not interchangeable with
/// [`VertexId`] even though both wrap `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct EdgeId(u64);

macro_rules! descriptor_impls {
    ($name:ident, $label:literal) => {
        impl $name {
            #[inline]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The underlying raw id.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// The raw id as an array index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(raw: usize) -> Self {
                Self(raw as u64)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(d: $name) -> u64 {
                d.0
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(d: $name) -> usize {
                d.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple($label).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

descriptor_impls!(VertexId, "VertexId");
descriptor_impls!(EdgeId, "EdgeId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_conversions() {
        let v = VertexId::new(42);
        assert_eq!(VertexId::from(u64::from(v)), v);
        let e = EdgeId::new(7);
        assert_eq!(EdgeId::from(u64::from(e)), e);
        assert_eq!(e.index(), 7usize);
    }

    #[test]
    fn debug_and_display() {
        let v = VertexId::new(7);
        assert_eq!(format!("{:?}", v), "VertexId(7)");
        assert_eq!(format!("{}", v), "7");
        let e = EdgeId::new(9);
        assert_eq!(format!("{:?}", e), "EdgeId(9)");
        assert_eq!(format!("{}", e), "9");
    }

    #[test]
    fn ordering_and_hash() {
        use std::collections::HashSet;
        let a = VertexId::new(1);
        let b = VertexId::new(2);
        assert!(a < b);
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(a);
        assert_eq!(set.len(), 2);
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that descriptors have the same layout as `u64`.
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(VertexId, u64);
    assert_eq_size!(EdgeId, u64);

    #[test]
    fn alignment_matches_u64() {
        assert_eq_align!(VertexId, u64);
        assert_eq_align!(EdgeId, u64);
    }
}

#[cfg(test)]
mod serde_tests {
    use super::*;

    #[test]
    fn json_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let v = VertexId::new(123);
        let s = serde_json::to_string(&v)?;
        let v2: VertexId = serde_json::from_str(&s)?;
        assert_eq!(v2, v);
        let e = EdgeId::new(456);
        let s = serde_json::to_string(&e)?;
        let e2: EdgeId = serde_json::from_str(&s)?;
        assert_eq!(e2, e);
        Ok(())
    }
}
