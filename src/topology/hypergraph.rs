//! Adjacency-list hypergraph store.
//!
//! Two block-distributed arrays of [`NodeData`] — one per vertex holding
//! incident edge descriptors, one per edge holding member vertex
//! descriptors — plus one [`DestinationBuffer`] per locale batching
//! cross-locale inclusion halves. Construction-time privatization gives
//! every locale a cached view of its own slice of both arrays.
//!
//! Analytic queries (degrees, butterflies, metamorphosis coefficients) scan
//! a quiescent graph; their results are undefined if the graph is mutated
//! concurrently.

use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::{Arc, Weak};

use crate::algs::intersection::intersection_size;
use crate::config::EngineConfig;
use crate::error::{HyperloomError, Result};
use crate::runtime::locale::{BlockDist, LocaleGroup, LocaleId};
use crate::runtime::registry::{self, PrivatizationId};
use crate::topology::buffer::{AppendStatus, DestinationBuffer, InclusionKind};
use crate::topology::descriptor::{EdgeId, VertexId};
use crate::topology::node_data::NodeData;

struct GraphInner {
    vertices: Box<[NodeData<EdgeId>]>,
    edges: Box<[NodeData<VertexId>]>,
    vertex_dist: BlockDist,
    edge_dist: BlockDist,
    buffers: Box<[DestinationBuffer]>,
    group: LocaleGroup,
    pid: OnceCell<PrivatizationId>,
}

impl Drop for GraphInner {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.get() {
            registry::unregister(*pid);
        }
    }
}

/// A parallel, locale-sharded hypergraph. Cheap to clone; clones share the
/// same storage.
#[derive(Clone)]
pub struct AdjListHyperGraph {
    inner: Arc<GraphInner>,
}

/// Per-locale privatized view: the locale's slice bounds plus, on non-zero
/// locales, a reference to the locale-0 master handle through which
/// administrative operations are routed.
pub struct LocaleHandle {
    locale: LocaleId,
    graph: Weak<GraphInner>,
    local_vertices: Range<usize>,
    local_edges: Range<usize>,
    master: Option<Arc<LocaleHandle>>,
}

impl LocaleHandle {
    pub fn locale(&self) -> LocaleId {
        self.locale
    }

    pub fn local_vertices(&self) -> Range<usize> {
        self.local_vertices.clone()
    }

    pub fn local_edges(&self) -> Range<usize> {
        self.local_edges.clone()
    }

    /// The locale-0 master handle; `None` on locale 0 itself.
    pub fn master(&self) -> Option<&Arc<LocaleHandle>> {
        self.master.as_ref()
    }

    /// Re-materialize the graph this handle views, if it is still alive.
    pub fn graph(&self) -> Option<AdjListHyperGraph> {
        self.graph.upgrade().map(|inner| AdjListHyperGraph { inner })
    }
}

impl AdjListHyperGraph {
    /// Allocate an empty graph with the given vertex and edge domains,
    /// block-distributed over the configured locales, and register its
    /// per-locale privatized handles.
    pub fn new(num_vertices: usize, num_edges: usize, cfg: &EngineConfig) -> Self {
        let group = LocaleGroup::from_config(cfg);
        let vertices = (0..num_vertices)
            .map(|_| NodeData::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let edges = (0..num_edges)
            .map(|_| NodeData::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let buffers = (0..group.n_locales())
            .map(|_| DestinationBuffer::new(cfg.dest_buffer_capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let inner = Arc::new(GraphInner {
            vertices,
            edges,
            vertex_dist: BlockDist::new(num_vertices, group.n_locales()),
            edge_dist: BlockDist::new(num_edges, group.n_locales()),
            buffers,
            group,
            pid: OnceCell::new(),
        });

        let master = Arc::new(LocaleHandle {
            locale: LocaleId::new(0),
            graph: Arc::downgrade(&inner),
            local_vertices: inner.vertex_dist.local_range(LocaleId::new(0)),
            local_edges: inner.edge_dist.local_range(LocaleId::new(0)),
            master: None,
        });
        let mut handles = vec![master.clone()];
        for loc in inner.group.locales().skip(1) {
            handles.push(Arc::new(LocaleHandle {
                locale: loc,
                graph: Arc::downgrade(&inner),
                local_vertices: inner.vertex_dist.local_range(loc),
                local_edges: inner.edge_dist.local_range(loc),
                master: Some(master.clone()),
            }));
        }
        let pid = registry::register(handles);
        let _ = inner.pid.set(pid);

        Self { inner }
    }

    /// Single-locale graph with default tunables; the common test entry.
    pub fn with_dims(num_vertices: usize, num_edges: usize) -> Self {
        Self::new(num_vertices, num_edges, &EngineConfig::default())
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.inner.vertices.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.inner.edges.len()
    }

    #[inline]
    pub fn group(&self) -> &LocaleGroup {
        &self.inner.group
    }

    pub fn privatization_id(&self) -> PrivatizationId {
        *self
            .inner
            .pid
            .get()
            .expect("privatization id assigned at construction")
    }

    /// Locale `loc`'s privatized handle.
    pub fn locale_handle(&self, loc: LocaleId) -> Option<Arc<LocaleHandle>> {
        registry::lookup::<LocaleHandle>(self.privatization_id(), loc)
    }

    // -- descriptor helpers -------------------------------------------------

    /// Integer-to-descriptor conversion, validated against the domain.
    pub fn to_vertex(&self, i: u64) -> Result<VertexId> {
        if (i as usize) < self.num_vertices() {
            Ok(VertexId::new(i))
        } else {
            Err(HyperloomError::InvalidVertex {
                id: i,
                max: self.num_vertices() as u64,
            })
        }
    }

    /// Integer-to-descriptor conversion, validated against the domain.
    pub fn to_edge(&self, i: u64) -> Result<EdgeId> {
        if (i as usize) < self.num_edges() {
            Ok(EdgeId::new(i))
        } else {
            Err(HyperloomError::InvalidEdge {
                id: i,
                max: self.num_edges() as u64,
            })
        }
    }

    fn check_vertex(&self, v: VertexId) -> Result<usize> {
        let i = v.index();
        if i < self.num_vertices() {
            Ok(i)
        } else {
            Err(HyperloomError::InvalidVertex {
                id: v.get(),
                max: self.num_vertices() as u64,
            })
        }
    }

    fn check_edge(&self, e: EdgeId) -> Result<usize> {
        let i = e.index();
        if i < self.num_edges() {
            Ok(i)
        } else {
            Err(HyperloomError::InvalidEdge {
                id: e.get(),
                max: self.num_edges() as u64,
            })
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> {
        (0..self.num_vertices() as u64).map(VertexId::new)
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.num_edges() as u64).map(EdgeId::new)
    }

    /// Owning locale of a vertex id.
    pub fn vertex_owner(&self, v: VertexId) -> LocaleId {
        self.inner.vertex_dist.owner(v.index())
    }

    /// Owning locale of an edge id.
    pub fn edge_owner(&self, e: EdgeId) -> LocaleId {
        self.inner.edge_dist.owner(e.index())
    }

    pub fn local_vertex_range(&self, loc: LocaleId) -> Range<usize> {
        self.inner.vertex_dist.local_range(loc)
    }

    pub fn local_edge_range(&self, loc: LocaleId) -> Range<usize> {
        self.inner.edge_dist.local_range(loc)
    }

    // -- mutation -----------------------------------------------------------

    /// Direct, unbuffered inclusion insert: locks both endpoint records and
    /// appends each side. Correct from any locale, at cross-locale latency.
    pub fn add_inclusion(&self, v: VertexId, e: EdgeId) -> Result<()> {
        let vi = self.check_vertex(v)?;
        let ei = self.check_edge(e)?;
        self.inner.vertices[vi].add_neighbor(e);
        self.inner.edges[ei].add_neighbor(v);
        Ok(())
    }

    /// Buffered inclusion insert: each half is routed to its owner locale's
    /// destination buffer; the appender that fills a buffer drains it.
    ///
    /// Not visible to queries until the buffer drains or [`flush_buffers`]
    /// runs.
    ///
    /// [`flush_buffers`]: AdjListHyperGraph::flush_buffers
    pub fn add_inclusion_buffered(&self, v: VertexId, e: EdgeId) -> Result<()> {
        let vi = self.check_vertex(v)?;
        let ei = self.check_edge(e)?;

        let vloc = self.inner.vertex_dist.owner(vi);
        if self.inner.buffers[vloc.get()].append(v.get(), e.get(), InclusionKind::Vertex)
            == AppendStatus::Full
        {
            self.drain_buffer(vloc);
        }

        let eloc = self.inner.edge_dist.owner(ei);
        if self.inner.buffers[eloc.get()].append(e.get(), v.get(), InclusionKind::Edge)
            == AppendStatus::Full
        {
            self.drain_buffer(eloc);
        }
        Ok(())
    }

    /// Drain one locale's buffer into its local incidence records, then
    /// clear it. Runs in the context of the owning locale.
    fn drain_buffer(&self, loc: LocaleId) {
        let inner = &self.inner;
        inner.group.on_locale(loc, || {
            debug_assert_eq!(LocaleGroup::here(), loc, "buffer drained off its locale");
            let buf = &inner.buffers[loc.get()];
            buf.for_each_filled(|src, dest, kind| match kind {
                InclusionKind::Vertex => {
                    inner.vertices[src as usize].add_neighbor(EdgeId::new(dest));
                }
                InclusionKind::Edge => {
                    inner.edges[src as usize].add_neighbor(VertexId::new(dest));
                }
                InclusionKind::None => {}
            });
            buf.clear();
        });
    }

    /// Quiescence barrier: drain and clear every locale's buffer, in
    /// parallel. Call after a generation phase, before any query.
    pub fn flush_buffers(&self) {
        self.inner.group.for_each_locale(|loc| self.drain_buffer(loc));
    }

    /// Sort and collapse duplicate inclusions on every record; returns the
    /// total number removed. Duplicates are an expected anomaly of
    /// probability-sampled generation, not an error.
    pub fn remove_duplicates(&self) -> usize {
        let dup_v: usize = self
            .inner
            .vertices
            .par_iter()
            .map(|n| n.sort_and_dedup())
            .sum();
        let dup_e: usize = self
            .inner
            .edges
            .par_iter()
            .map(|n| n.sort_and_dedup())
            .sum();
        // Both sides record every duplicate pair once.
        debug_assert_eq!(dup_v, dup_e);
        if dup_v > 0 {
            log::debug!("collapsed {dup_v} duplicate inclusions");
        }
        dup_v
    }

    // -- queries ------------------------------------------------------------

    /// Snapshot of the edges incident to `v`, in insertion order.
    pub fn incident_edges(&self, v: VertexId) -> Result<Vec<EdgeId>> {
        let vi = self.check_vertex(v)?;
        Ok(self.inner.vertices[vi].snapshot())
    }

    /// Snapshot of the vertices on `e`, in insertion order.
    pub fn incident_vertices(&self, e: EdgeId) -> Result<Vec<VertexId>> {
        let ei = self.check_edge(e)?;
        Ok(self.inner.edges[ei].snapshot())
    }

    /// Snapshot of the edges incident to `v`, sorted ascending.
    pub fn incident_edges_sorted(&self, v: VertexId) -> Result<Vec<EdgeId>> {
        let vi = self.check_vertex(v)?;
        Ok(self.inner.vertices[vi].sorted_snapshot())
    }

    /// Snapshot of the vertices on `e`, sorted ascending.
    pub fn incident_vertices_sorted(&self, e: EdgeId) -> Result<Vec<VertexId>> {
        let ei = self.check_edge(e)?;
        Ok(self.inner.edges[ei].sorted_snapshot())
    }

    pub fn has_inclusion(&self, v: VertexId, e: EdgeId) -> Result<bool> {
        let vi = self.check_vertex(v)?;
        self.check_edge(e)?;
        Ok(self.inner.vertices[vi].has_neighbor(&e))
    }

    /// Degree of a vertex; lock-free.
    pub fn vertex_degree(&self, v: VertexId) -> Result<usize> {
        let vi = self.check_vertex(v)?;
        Ok(self.inner.vertices[vi].num_neighbors())
    }

    /// Degree of an edge (its cardinality); lock-free.
    pub fn edge_degree(&self, e: EdgeId) -> Result<usize> {
        let ei = self.check_edge(e)?;
        Ok(self.inner.edges[ei].num_neighbors())
    }

    /// All vertex degrees. Undefined under concurrent mutation.
    pub fn vertex_degrees(&self) -> Vec<usize> {
        self.inner
            .vertices
            .par_iter()
            .map(|n| n.num_neighbors())
            .collect()
    }

    /// All edge degrees. Undefined under concurrent mutation.
    pub fn edge_degrees(&self) -> Vec<usize> {
        self.inner
            .edges
            .par_iter()
            .map(|n| n.num_neighbors())
            .collect()
    }

    /// Visit `(descriptor, degree)` for every vertex, in parallel.
    pub fn for_each_vertex_degree<F>(&self, f: F)
    where
        F: Fn(VertexId, usize) + Sync,
    {
        self.inner
            .vertices
            .par_iter()
            .enumerate()
            .for_each(|(i, n)| f(VertexId::from(i), n.num_neighbors()));
    }

    /// Visit `(descriptor, degree)` for every edge, in parallel.
    pub fn for_each_edge_degree<F>(&self, f: F)
    where
        F: Fn(EdgeId, usize) + Sync,
    {
        self.inner
            .edges
            .par_iter()
            .enumerate()
            .for_each(|(i, n)| f(EdgeId::from(i), n.num_neighbors()));
    }

    /// Vertices whose current degree is exactly `d`.
    pub fn vertices_with_degree(&self, d: usize) -> Vec<VertexId> {
        self.inner
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, n)| n.num_neighbors() == d)
            .map(|(i, _)| VertexId::from(i))
            .collect()
    }

    /// Edges whose current cardinality is exactly `d`.
    pub fn edges_with_degree(&self, d: usize) -> Vec<EdgeId> {
        self.inner
            .edges
            .iter()
            .enumerate()
            .filter(|(_, n)| n.num_neighbors() == d)
            .map(|(i, _)| EdgeId::from(i))
            .collect()
    }

    // -- butterfly analytics ------------------------------------------------

    /// Per-vertex butterfly (bipartite four-cycle) counts.
    ///
    /// For each vertex `v`, `C[w]` counts the edges shared with each
    /// distance-two vertex `w`; `v` participates in `Σ_w C(C[w], 2)`
    /// butterflies.
    pub fn vertex_butterflies(&self) -> Vec<u64> {
        let inner = &self.inner;
        (0..inner.vertices.len())
            .into_par_iter()
            .map(|vi| {
                let mut mult: hashbrown::HashMap<u64, u64> = hashbrown::HashMap::new();
                for e in inner.vertices[vi].snapshot() {
                    for w in inner.edges[e.index()].snapshot() {
                        if w.index() != vi {
                            *mult.entry(w.get()).or_insert(0) += 1;
                        }
                    }
                }
                mult.values().map(|&c| c * (c - 1) / 2).sum()
            })
            .collect()
    }

    /// Per-edge butterfly counts; the edge-side mirror of
    /// [`vertex_butterflies`](AdjListHyperGraph::vertex_butterflies).
    pub fn edge_butterflies(&self) -> Vec<u64> {
        let inner = &self.inner;
        (0..inner.edges.len())
            .into_par_iter()
            .map(|ei| {
                let mut mult: hashbrown::HashMap<u64, u64> = hashbrown::HashMap::new();
                for v in inner.edges[ei].snapshot() {
                    for f in inner.vertices[v.index()].snapshot() {
                        if f.index() != ei {
                            *mult.entry(f.get()).or_insert(0) += 1;
                        }
                    }
                }
                mult.values().map(|&c| c * (c - 1) / 2).sum()
            })
            .collect()
    }

    /// Butterflies through the inclusion `(v, e)`: for each other member
    /// `w` of `e`, the edges `v` and `w` share besides `e` itself.
    pub fn inclusion_butterflies(&self, v: VertexId, e: EdgeId) -> Result<u64> {
        let vi = self.check_vertex(v)?;
        let ei = self.check_edge(e)?;
        let v_edges = self.inner.vertices[vi].sorted_snapshot();
        let mut count = 0u64;
        for w in self.inner.edges[ei].snapshot() {
            if w.index() == vi {
                continue;
            }
            let w_edges = self.inner.vertices[w.index()].sorted_snapshot();
            let common = intersection_size(&v_edges, &w_edges) as u64;
            count += common.saturating_sub(1);
        }
        Ok(count)
    }

    /// Caterpillars (open four-paths) through `(v, e)`:
    /// `(deg(v) − 1) · (deg(e) − 1)`.
    pub fn inclusion_caterpillars(&self, v: VertexId, e: EdgeId) -> Result<u64> {
        let dv = self.vertex_degree(v)? as u64;
        let de = self.edge_degree(e)? as u64;
        Ok(dv.saturating_sub(1) * de.saturating_sub(1))
    }

    /// Metamorphosis coefficient of `(v, e)`: butterflies per caterpillar,
    /// zero when there are no caterpillars.
    pub fn inclusion_metamorph_coef(&self, v: VertexId, e: EdgeId) -> Result<f64> {
        let cats = self.inclusion_caterpillars(v, e)?;
        if cats == 0 {
            return Ok(0.0);
        }
        let wings = self.inclusion_butterflies(v, e)?;
        Ok(wings as f64 / cats as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(nv: usize, ne: usize) -> AdjListHyperGraph {
        let g = AdjListHyperGraph::with_dims(nv, ne);
        for v in 0..nv as u64 {
            for e in 0..ne as u64 {
                g.add_inclusion(VertexId::new(v), EdgeId::new(e)).unwrap();
            }
        }
        g
    }

    #[test]
    fn direct_insert_links_both_sides() {
        let g = AdjListHyperGraph::with_dims(3, 2);
        g.add_inclusion(VertexId::new(1), EdgeId::new(0)).unwrap();
        assert!(g.has_inclusion(VertexId::new(1), EdgeId::new(0)).unwrap());
        assert_eq!(g.incident_edges(VertexId::new(1)).unwrap(), vec![EdgeId::new(0)]);
        assert_eq!(
            g.incident_vertices(EdgeId::new(0)).unwrap(),
            vec![VertexId::new(1)]
        );
        assert_eq!(g.vertex_degree(VertexId::new(0)).unwrap(), 0);
    }

    #[test]
    fn out_of_range_descriptors_rejected() {
        let g = AdjListHyperGraph::with_dims(2, 2);
        assert!(matches!(
            g.add_inclusion(VertexId::new(5), EdgeId::new(0)),
            Err(HyperloomError::InvalidVertex { id: 5, .. })
        ));
        assert!(matches!(
            g.to_edge(2),
            Err(HyperloomError::InvalidEdge { id: 2, .. })
        ));
        assert_eq!(g.to_vertex(1).unwrap(), VertexId::new(1));
    }

    #[test]
    fn buffered_insert_visible_after_flush() {
        let mut cfg = EngineConfig::default();
        cfg.dest_buffer_capacity = 8;
        cfg.n_locales = 2;
        let g = AdjListHyperGraph::new(16, 16, &cfg);
        for i in 0..16u64 {
            g.add_inclusion_buffered(VertexId::new(i), EdgeId::new(15 - i))
                .unwrap();
        }
        g.flush_buffers();
        for i in 0..16u64 {
            assert!(g
                .has_inclusion(VertexId::new(i), EdgeId::new(15 - i))
                .unwrap());
        }
    }

    #[test]
    fn duplicate_collapse_counts_pairs() {
        let g = AdjListHyperGraph::with_dims(2, 2);
        let (v, e) = (VertexId::new(0), EdgeId::new(1));
        g.add_inclusion(v, e).unwrap();
        g.add_inclusion(v, e).unwrap();
        g.add_inclusion(v, e).unwrap();
        assert_eq!(g.remove_duplicates(), 2);
        assert_eq!(g.vertex_degree(v).unwrap(), 1);
        assert_eq!(g.edge_degree(e).unwrap(), 1);
    }

    #[test]
    fn complete_2_3_butterflies() {
        // K_{2,3}: each vertex shares all 3 edges with the other, giving
        // C(3,2) = 3 butterflies per vertex.
        let g = complete(2, 3);
        assert_eq!(g.vertex_butterflies(), vec![3, 3]);
        // Each edge pairs with each of the 2 other edges through C(2,2)=1
        // choice of the 2 shared vertices.
        assert_eq!(g.edge_butterflies(), vec![2, 2, 2]);
    }

    #[test]
    fn inclusion_metrics_on_complete_2_3() {
        let g = complete(2, 3);
        let (v, e) = (VertexId::new(0), EdgeId::new(0));
        // One other member of e; it shares 3 edges with v, minus e itself.
        assert_eq!(g.inclusion_butterflies(v, e).unwrap(), 2);
        // (deg(v)-1)(deg(e)-1) = (3-1)(2-1) = 2.
        assert_eq!(g.inclusion_caterpillars(v, e).unwrap(), 2);
        assert!((g.inclusion_metamorph_coef(v, e).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degree_value_queries() {
        let g = AdjListHyperGraph::with_dims(3, 2);
        g.add_inclusion(VertexId::new(0), EdgeId::new(0)).unwrap();
        g.add_inclusion(VertexId::new(0), EdgeId::new(1)).unwrap();
        g.add_inclusion(VertexId::new(1), EdgeId::new(0)).unwrap();
        assert_eq!(g.vertices_with_degree(2), vec![VertexId::new(0)]);
        assert_eq!(g.vertices_with_degree(1), vec![VertexId::new(1)]);
        assert_eq!(g.vertices_with_degree(0), vec![VertexId::new(2)]);
        assert_eq!(g.edges_with_degree(2), vec![EdgeId::new(0)]);
    }

    #[test]
    fn privatized_handles_cover_domains() {
        let mut cfg = EngineConfig::default();
        cfg.n_locales = 3;
        let g = AdjListHyperGraph::new(10, 7, &cfg);
        let mut v_total = 0;
        let mut e_total = 0;
        for loc in g.group().locales() {
            let h = g.locale_handle(loc).expect("handle registered");
            assert_eq!(h.locale(), loc);
            v_total += h.local_vertices().len();
            e_total += h.local_edges().len();
            if loc.get() == 0 {
                assert!(h.master().is_none());
            } else {
                assert_eq!(h.master().unwrap().locale(), LocaleId::new(0));
            }
            assert!(h.graph().is_some());
        }
        assert_eq!(v_total, 10);
        assert_eq!(e_total, 7);
    }

    #[test]
    fn registry_entry_dropped_with_graph() {
        let pid = {
            let g = AdjListHyperGraph::with_dims(2, 2);
            let pid = g.privatization_id();
            assert!(g.locale_handle(LocaleId::new(0)).is_some());
            pid
        };
        assert!(crate::runtime::registry::lookup::<LocaleHandle>(pid, LocaleId::new(0)).is_none());
    }
}
