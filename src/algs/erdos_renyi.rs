//! Erdős–Rényi random hypergraph generation.
//!
//! Every `(vertex, edge)` pair is included independently with probability
//! `p`. The generator draws `round(|V|·|E|·p)` uniform pairs — optionally
//! with the coupon-collector correction `p' = ln(1/(1−p))`, which
//! compensates for the duplicates i.i.d. sampling produces — and feeds them
//! through the buffered insertion path, flushing at the end. Work is split
//! across locales and workers with independent deterministic RNG streams.

use rand::Rng;
use rayon::prelude::*;
use std::ops::Range;

use crate::error::{HyperloomError, Result};
use crate::runtime::stream::task_rng;
use crate::topology::descriptor::{EdgeId, VertexId};
use crate::topology::hypergraph::AdjListHyperGraph;

/// Split `total` into `parts` near-equal shares; share `idx` gets the
/// remainder's first `total % parts` units.
pub(crate) fn share(total: u64, parts: usize, idx: usize) -> u64 {
    let parts = parts.max(1) as u64;
    let idx = idx as u64;
    total / parts + u64::from(idx < total % parts)
}

/// Start of share `idx` in the concatenation of all shares.
pub(crate) fn share_offset(total: u64, parts: usize, idx: usize) -> u64 {
    let parts = parts.max(1) as u64;
    let idx = idx as u64;
    idx * (total / parts) + idx.min(total % parts)
}

/// Generate over the full vertex and edge domains.
pub fn erdos_renyi(
    graph: &AdjListHyperGraph,
    p: f64,
    coupon_collector: bool,
    seed: u64,
) -> Result<u64> {
    erdos_renyi_between(
        graph,
        0..graph.num_vertices(),
        0..graph.num_edges(),
        p,
        coupon_collector,
        seed,
    )
}

/// Generate over an id sub-domain; the building block of BTER affinity
/// blocks.
pub fn erdos_renyi_between(
    graph: &AdjListHyperGraph,
    vrange: Range<usize>,
    erange: Range<usize>,
    p: f64,
    coupon_collector: bool,
    seed: u64,
) -> Result<u64> {
    if !(0.0..=1.0).contains(&p) || !p.is_finite() {
        return Err(HyperloomError::BadProbability(p));
    }
    if vrange.end > graph.num_vertices() {
        return Err(HyperloomError::InvalidVertex {
            id: vrange.end as u64,
            max: graph.num_vertices() as u64,
        });
    }
    if erange.end > graph.num_edges() {
        return Err(HyperloomError::InvalidEdge {
            id: erange.end as u64,
            max: graph.num_edges() as u64,
        });
    }
    let p_eff = if coupon_collector {
        if p >= 1.0 {
            return Err(HyperloomError::BadProbability(p));
        }
        (1.0 / (1.0 - p)).ln()
    } else {
        p
    };

    let (nv, ne) = (vrange.len(), erange.len());
    if nv == 0 || ne == 0 || p_eff == 0.0 {
        return Ok(0);
    }
    let pairs = nv as u128 * ne as u128;
    let total = ((nv as f64) * (ne as f64) * p_eff).round() as u64;
    if total == 0 {
        return Ok(0);
    }

    // Draw k is uniform within its stratum [k·P/I, (k+1)·P/I) of the pair
    // index space, so the I draws spread evenly over the domain; at p = 1
    // without correction every pair is drawn exactly once.
    let group = *graph.group();
    let mtp = group.max_task_par();
    for loc in group.locales() {
        let locale_share = share(total, group.n_locales(), loc.get());
        if locale_share == 0 {
            continue;
        }
        let locale_offset = share_offset(total, group.n_locales(), loc.get());
        let vstart = vrange.start;
        let estart = erange.start;
        (0..mtp).into_par_iter().try_for_each(|t| -> Result<()> {
            let count = share(locale_share, mtp, t);
            let start = locale_offset + share_offset(locale_share, mtp, t);
            let mut rng = task_rng(seed, loc, mtp, t);
            for k in start..start + count {
                let lo = (k as u128 * pairs / total as u128) as u64;
                let mut hi = ((k as u128 + 1) * pairs / total as u128) as u64;
                if hi <= lo {
                    hi = lo + 1;
                }
                let hi = (hi as u128).min(pairs) as u64;
                let pair = rng.gen_range(lo..hi.max(lo + 1));
                let v = VertexId::from(vstart as u64 + pair / ne as u64);
                let e = EdgeId::from(estart as u64 + pair % ne as u64);
                graph.add_inclusion_buffered(v, e)?;
            }
            Ok(())
        })?;
    }
    graph.flush_buffers();
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn shares_sum_to_total() {
        for &(total, parts) in &[(10u64, 3usize), (7, 7), (0, 4), (13, 5)] {
            let sum: u64 = (0..parts).map(|i| share(total, parts, i)).sum();
            assert_eq!(sum, total);
        }
    }

    #[test]
    fn p_one_without_correction_is_complete() {
        let g = AdjListHyperGraph::with_dims(4, 4);
        let total = erdos_renyi(&g, 1.0, false, 1).unwrap();
        assert_eq!(total, 16);
        for v in g.vertices() {
            for e in g.edges() {
                assert!(g.has_inclusion(v, e).unwrap(), "missing ({v}, {e})");
            }
        }
    }

    #[test]
    fn bad_probabilities_rejected() {
        let g = AdjListHyperGraph::with_dims(2, 2);
        assert!(matches!(
            erdos_renyi(&g, 1.5, false, 1),
            Err(HyperloomError::BadProbability(_))
        ));
        assert!(matches!(
            erdos_renyi(&g, -0.1, false, 1),
            Err(HyperloomError::BadProbability(_))
        ));
        // The correction diverges at p = 1.
        assert!(matches!(
            erdos_renyi(&g, 1.0, true, 1),
            Err(HyperloomError::BadProbability(_))
        ));
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let run = |seed| {
            let mut cfg = EngineConfig::default();
            cfg.max_task_par = Some(2);
            let g = AdjListHyperGraph::new(32, 32, &cfg);
            erdos_renyi(&g, 0.2, true, seed).unwrap();
            g.remove_duplicates();
            let mut all = Vec::new();
            for v in g.vertices() {
                all.push(g.incident_edges_sorted(v).unwrap());
            }
            all
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn subdomain_generation_stays_in_bounds() {
        let g = AdjListHyperGraph::with_dims(10, 10);
        erdos_renyi_between(&g, 2..5, 4..8, 1.0, false, 7).unwrap();
        for v in g.vertices() {
            let in_block = (2..5).contains(&v.index());
            for e in g.incident_edges(v).unwrap() {
                assert!(in_block, "vertex {v} outside block has inclusions");
                assert!((4..8).contains(&e.index()));
            }
        }
    }
}
