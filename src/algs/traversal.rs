//! Work-queue-driven traversals: incidence BFS and s-walk distance.
//!
//! Both drivers follow the termination protocol exactly: a unit is marked
//! started before it is enqueued and finished when its handler returns, so
//! the detector's quiescence is the loop's exit condition. Distances live
//! in atomic arrays updated by monotone relaxation; whoever lowers a slot
//! re-enqueues that node.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::algs::intersection::intersection_size_at_least;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::runtime::termination::TerminationDetector;
use crate::topology::descriptor::{EdgeId, VertexId};
use crate::topology::hypergraph::AdjListHyperGraph;
use crate::work::queue::{work_loop, WorkQueue};

/// Sentinel distance of an unreached node.
pub const UNREACHED: u64 = u64::MAX;

/// Monotone distance relaxation; true when `candidate` improved the slot.
/// The winner is the only enqueuer for the node at that distance, so the
/// arrays converge to exact hop distances by quiescence even though the
/// queue is not level-synchronous.
fn relax(slot: &AtomicU64, candidate: u64) -> bool {
    let mut current = slot.load(Ordering::Relaxed);
    while candidate < current {
        match slot.compare_exchange_weak(
            current,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
    false
}

/// Hop distances from `root` over the incidence structure: two vertices are
/// one hop apart when they share a hyperedge. Unreached vertices report
/// [`UNREACHED`].
pub fn bfs_vertices(
    graph: &AdjListHyperGraph,
    root: VertexId,
    cfg: &EngineConfig,
) -> Result<Vec<u64>> {
    graph.to_vertex(root.get())?;

    let vdist: Vec<AtomicU64> = (0..graph.num_vertices())
        .map(|_| AtomicU64::new(UNREACHED))
        .collect();

    let wq: WorkQueue<VertexId> = WorkQueue::for_group(*graph.group(), cfg);
    let td = TerminationDetector::new();

    vdist[root.index()].store(0, Ordering::Relaxed);
    td.started(1);
    wq.add_work(root, graph.vertex_owner(root))?;

    work_loop(&wq, &td, |v: VertexId| {
        let d = vdist[v.index()].load(Ordering::Relaxed);
        for e in graph.incident_edges(v).unwrap_or_default() {
            for w in graph.incident_vertices(e).unwrap_or_default() {
                if relax(&vdist[w.index()], d + 1) {
                    td.started(1);
                    let _ = wq.add_work(w, graph.vertex_owner(w));
                }
            }
        }
        td.finished(1);
    });

    Ok(vdist.into_iter().map(AtomicU64::into_inner).collect())
}

/// s-walk distance between two hyperedges: edges are adjacent when they
/// share at least `s` vertices. Returns `None` when `target` is unreachable
/// from `source`.
pub fn s_distance(
    graph: &AdjListHyperGraph,
    source: EdgeId,
    target: EdgeId,
    s: usize,
    cfg: &EngineConfig,
) -> Result<Option<u64>> {
    graph.to_edge(source.get())?;
    graph.to_edge(target.get())?;

    let edist: Vec<AtomicU64> = (0..graph.num_edges())
        .map(|_| AtomicU64::new(UNREACHED))
        .collect();

    let wq: WorkQueue<EdgeId> = WorkQueue::for_group(*graph.group(), cfg);
    let td = TerminationDetector::new();

    edist[source.index()].store(0, Ordering::Relaxed);
    td.started(1);
    wq.add_work(source, graph.edge_owner(source))?;

    work_loop(&wq, &td, |e: EdgeId| {
        let d = edist[e.index()].load(Ordering::Relaxed);
        let e_verts = graph.incident_vertices_sorted(e).unwrap_or_default();
        for v in &e_verts {
            for f in graph.incident_edges(*v).unwrap_or_default() {
                if f == e || edist[f.index()].load(Ordering::Relaxed) <= d {
                    continue;
                }
                let f_verts = graph.incident_vertices_sorted(f).unwrap_or_default();
                if !intersection_size_at_least(&e_verts, &f_verts, s) {
                    continue;
                }
                if relax(&edist[f.index()], d + 1) {
                    td.started(1);
                    let _ = wq.add_work(f, graph.edge_owner(f));
                }
            }
        }
        td.finished(1);
    });

    let out = edist[target.index()].load(Ordering::Relaxed);
    Ok((out != UNREACHED).then_some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg(n_locales: usize) -> EngineConfig {
        EngineConfig {
            n_locales,
            max_task_par: Some(2),
            initial_block_size: 8,
            max_block_size: 64,
            ..EngineConfig::default()
        }
    }

    /// Path hypergraph: edge i = {v_i, v_{i+1}}.
    fn path(n: usize, cfg: &EngineConfig) -> AdjListHyperGraph {
        let g = AdjListHyperGraph::new(n, n - 1, cfg);
        for i in 0..n - 1 {
            g.add_inclusion(VertexId::from(i), EdgeId::from(i)).unwrap();
            g.add_inclusion(VertexId::from(i + 1), EdgeId::from(i)).unwrap();
        }
        g
    }

    #[test]
    fn bfs_distances_on_a_path() {
        let cfg = small_cfg(2);
        let g = path(6, &cfg);
        let dist = bfs_vertices(&g, VertexId::new(0), &cfg).unwrap();
        assert_eq!(dist, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn bfs_leaves_disconnected_unreached() {
        let cfg = small_cfg(1);
        let g = AdjListHyperGraph::new(4, 1, &cfg);
        g.add_inclusion(VertexId::new(0), EdgeId::new(0)).unwrap();
        g.add_inclusion(VertexId::new(1), EdgeId::new(0)).unwrap();
        let dist = bfs_vertices(&g, VertexId::new(0), &cfg).unwrap();
        assert_eq!(dist[0], 0);
        assert_eq!(dist[1], 1);
        assert_eq!(dist[2], UNREACHED);
        assert_eq!(dist[3], UNREACHED);
    }

    #[test]
    fn s_distance_respects_overlap_threshold() {
        // Three edges on 4 vertices: e0={0,1,2}, e1={1,2,3}, e2={3}.
        let cfg = small_cfg(1);
        let g = AdjListHyperGraph::new(4, 3, &cfg);
        for &(v, e) in &[(0, 0), (1, 0), (2, 0), (1, 1), (2, 1), (3, 1), (3, 2)] {
            g.add_inclusion(VertexId::new(v), EdgeId::new(e)).unwrap();
        }
        // e0 and e1 share {1,2}: adjacent for s=1 and s=2, not s=3.
        assert_eq!(
            s_distance(&g, EdgeId::new(0), EdgeId::new(1), 2, &cfg).unwrap(),
            Some(1)
        );
        assert_eq!(
            s_distance(&g, EdgeId::new(0), EdgeId::new(1), 3, &cfg).unwrap(),
            None
        );
        // e0 -> e1 -> e2 under s=1 (e1 and e2 share {3}).
        assert_eq!(
            s_distance(&g, EdgeId::new(0), EdgeId::new(2), 1, &cfg).unwrap(),
            Some(2)
        );
        // Under s=2 the walk stops at e1.
        assert_eq!(
            s_distance(&g, EdgeId::new(0), EdgeId::new(2), 2, &cfg).unwrap(),
            None
        );
    }

    #[test]
    fn multi_locale_bfs_matches_single() {
        let single = small_cfg(1);
        let multi = small_cfg(3);
        let g1 = path(12, &single);
        let g3 = path(12, &multi);
        let d1 = bfs_vertices(&g1, VertexId::new(4), &single).unwrap();
        let d3 = bfs_vertices(&g3, VertexId::new(4), &multi).unwrap();
        assert_eq!(d1, d3);
    }
}
