//! Chung–Lu random hypergraph generation.
//!
//! Matches a desired degree sequence in expectation: each inclusion picks
//! its vertex and edge independently with probability proportional to the
//! node's desired degree, via inverse sampling over normalized prefix sums.
//! `round(Σ dV)` inclusions are drawn in total, split across locales and
//! workers; duplicates are an expected anomaly of i.i.d. sampling and are
//! left to [`remove_duplicates`](crate::topology::AdjListHyperGraph::remove_duplicates).

use rand::Rng;
use rayon::prelude::*;

use super::erdos_renyi::share;
use super::sample::{normalized_prefix, random_element};
use crate::error::{HyperloomError, Result};
use crate::runtime::stream::task_rng;
use crate::topology::descriptor::{EdgeId, VertexId};
use crate::topology::hypergraph::AdjListHyperGraph;

/// Generate `round(Σ vertex_degrees)` inclusions matching the desired
/// vertex and edge degree sequences in expectation; returns the count.
pub fn chung_lu(
    graph: &AdjListHyperGraph,
    vertex_degrees: &[f64],
    edge_degrees: &[f64],
    seed: u64,
) -> Result<u64> {
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
    let total = vertex_degrees.iter().sum::<f64>().round() as u64;
    chung_lu_inclusions(graph, vertex_degrees, edge_degrees, total, seed)?;
    Ok(total)
}

/// Draw exactly `total` Chung–Lu inclusions; the residual top-up pass of
/// BTER uses this with leftover degree mass.
pub(crate) fn chung_lu_inclusions(
    graph: &AdjListHyperGraph,
    vertex_degrees: &[f64],
    edge_degrees: &[f64],
    total: u64,
    seed: u64,
) -> Result<()> {
    if total == 0 {
        return Ok(());
    }
    let pv = normalized_prefix(vertex_degrees);
    let pe = normalized_prefix(edge_degrees);

    let group = *graph.group();
    let mtp = group.max_task_par();
    for loc in group.locales() {
        let locale_share = share(total, group.n_locales(), loc.get());
        if locale_share == 0 {
            continue;
        }
        (0..mtp).into_par_iter().try_for_each(|t| -> Result<()> {
            let count = share(locale_share, mtp, t);
            let mut rng = task_rng(seed, loc, mtp, t);
            for _ in 0..count {
                let rv: f64 = rng.gen();
                let re: f64 = rng.gen();
                let v = VertexId::from(random_element(&pv, rv)?);
                let e = EdgeId::from(random_element(&pe, re)?);
                graph.add_inclusion_buffered(v, e)?;
            }
            Ok(())
        })?;
    }
    graph.flush_buffers();
    Ok(())
}
