//! BTER (Block Two-level Erdős–Rényi) hypergraph generation.
//!
//! Nodes are grouped by degree class into affinity blocks; each block gets
//! dense Erdős–Rényi wiring at a density chosen so the block reproduces the
//! target metamorphosis coefficients, and whatever degree mass the blocks
//! leave unmatched is topped up with a Chung–Lu pass. Degree sequences must
//! be sorted ascending so that a block covers a contiguous id range.

use crate::algs::chung_lu::chung_lu_inclusions;
use crate::algs::erdos_renyi::erdos_renyi_between;
use crate::error::{HyperloomError, Result};
use crate::runtime::stream::derive_seed;
use crate::topology::hypergraph::AdjListHyperGraph;

/// `"residual"` in ASCII; tags the top-up pass's seed derivation.
const RESIDUAL_TAG: u64 = 0x7265_7369_6475_616C;

/// Affinity-block shape for degree classes `(dv, de)` with metamorphosis
/// coefficients `(mv, me)`: the block's vertex count, edge count, and
/// internal Erdős–Rényi density.
pub fn affinity_block(dv: f64, de: f64, mv: f64, me: f64) -> (usize, usize, f64) {
    let (nv, ne, rho) = if me <= 0.0 || mv / me >= 1.0 {
        let denom = mv * dv - me;
        let rho = if denom > 0.0 {
            (((dv - 1.0) * me * me) / denom).powf(0.25)
        } else {
            0.0
        };
        (de, (mv / me) * dv, rho)
    } else {
        let denom = me * de - mv;
        let rho = if denom > 0.0 {
            (((de - 1.0) * mv * mv) / denom).powf(0.25)
        } else {
            0.0
        };
        ((me / mv) * de, dv, rho)
    };
    if !nv.is_finite() || !ne.is_finite() {
        return (0, 0, 0.0);
    }
    let rho = if rho.is_finite() { rho.clamp(0.0, 1.0) } else { 0.0 };
    (nv.round() as usize, ne.round() as usize, rho)
}

/// Per-degree coefficient lookup, clamped to the table's last entry.
fn coef(table: &[f64], degree: u64) -> f64 {
    let idx = degree.saturating_sub(1) as usize;
    table
        .get(idx)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(0.0)
}

fn check_sorted(degrees: &[u64]) -> Result<()> {
    if degrees.windows(2).any(|w| w[0] > w[1]) {
        return Err(HyperloomError::UnsortedDegrees);
    }
    Ok(())
}

/// Generate a BTER hypergraph matching the (ascending) degree sequences and
/// per-degree metamorphosis coefficient tables.
pub fn bter(
    graph: &AdjListHyperGraph,
    vertex_degrees: &[u64],
    edge_degrees: &[u64],
    vertex_metamorph: &[f64],
    edge_metamorph: &[f64],
    seed: u64,
) -> Result<()> {
    if vertex_degrees.len() != graph.num_vertices() {
        return Err(HyperloomError::DegreeLengthMismatch {
            expected: graph.num_vertices(),
            got: vertex_degrees.len(),
        });
    }
    if edge_degrees.len() != graph.num_edges() {
        return Err(HyperloomError::DegreeLengthMismatch {
            expected: graph.num_edges(),
            got: edge_degrees.len(),
        });
    }
    check_sorted(vertex_degrees)?;
    check_sorted(edge_degrees)?;

    let (nv, ne) = (vertex_degrees.len(), edge_degrees.len());
    let (mut vi, mut ei) = (0usize, 0usize);
    let mut round = 0u64;

    while vi < nv && ei < ne {
        let dv = vertex_degrees[vi];
        let de = edge_degrees[ei];
        // Skip isolated nodes; they carry no block.
        if dv == 0 {
            vi += 1;
            continue;
        }
        if de == 0 {
            ei += 1;
            continue;
        }
        let mv = coef(vertex_metamorph, dv);
        let me = coef(edge_metamorph, de);
        let (bv, be, rho) = affinity_block(dv as f64, de as f64, mv, me);
        if bv == 0 || be == 0 || vi + bv > nv || ei + be > ne {
            break;
        }
        erdos_renyi_between(
            graph,
            vi..vi + bv,
            ei..ei + be,
            rho,
            false,
            derive_seed(seed, round),
        )?;
        vi += bv;
        ei += be;
        round += 1;
    }

    // Residual pass: whatever degree mass the blocks did not realize is
    // matched in expectation by Chung-Lu.
    let observed_v = graph.vertex_degrees();
    let observed_e = graph.edge_degrees();
    let resid_v: Vec<f64> = vertex_degrees
        .iter()
        .zip(&observed_v)
        .map(|(&want, &have)| (want as f64 - have as f64).max(0.0))
        .collect();
    let resid_e: Vec<f64> = edge_degrees
        .iter()
        .zip(&observed_e)
        .map(|(&want, &have)| (want as f64 - have as f64).max(0.0))
        .collect();
    let residual_total = resid_v.iter().sum::<f64>().round() as u64;
    if residual_total > 0 {
        chung_lu_inclusions(
            graph,
            &resid_v,
            &resid_e,
            residual_total,
            derive_seed(seed, RESIDUAL_TAG),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_block_vertex_heavy_case() {
        // mv/me >= 1: block spans de vertices and (mv/me)*dv edges.
        let (nv, ne, rho) = affinity_block(4.0, 3.0, 0.8, 0.4);
        assert_eq!(nv, 3);
        assert_eq!(ne, 8);
        assert!(rho > 0.0 && rho <= 1.0);
    }

    #[test]
    fn affinity_block_edge_heavy_case() {
        let (nv, ne, rho) = affinity_block(3.0, 4.0, 0.4, 0.8);
        assert_eq!(nv, 8);
        assert_eq!(ne, 3);
        assert!(rho > 0.0 && rho <= 1.0);
    }

    #[test]
    fn degenerate_coefficients_collapse_to_empty_block() {
        let (nv, ne, rho) = affinity_block(4.0, 3.0, 0.0, 0.0);
        assert_eq!((nv, ne), (0, 0));
        assert_eq!(rho, 0.0);
    }

    #[test]
    fn unsorted_degrees_rejected() {
        let g = AdjListHyperGraph::with_dims(3, 3);
        assert!(matches!(
            bter(&g, &[2, 1, 3], &[1, 1, 1], &[0.5], &[0.5], 1),
            Err(HyperloomError::UnsortedDegrees)
        ));
    }

    #[test]
    fn produces_roughly_requested_mass() {
        let g = AdjListHyperGraph::with_dims(16, 16);
        let dv: Vec<u64> = (0..16).map(|i| 1 + i as u64 / 4).collect();
        let de = dv.clone();
        bter(&g, &dv, &de, &[0.5, 0.5, 0.5, 0.5], &[0.5, 0.5, 0.5, 0.5], 17).unwrap();
        let want: u64 = dv.iter().sum();
        let got: usize = g.vertex_degrees().iter().sum();
        // Blocks plus residual land near the target mass; duplicates and
        // rounding keep this approximate.
        assert!(got as u64 >= want / 2, "got {got}, want ~{want}");
    }
}
