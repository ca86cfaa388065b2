//! Readers for the two on-disk incidence formats.
//!
//! - Incidence CSV: one `v_id,e_id` pair per line; vertex and edge id
//!   spaces are independent and start at 0.
//! - Binary CSR: little-endian `u64 numVertices`, `u64 numEdges`, an offset
//!   table of `numVertices + 1` `u64` values, then the flat `u64` adjacency
//!   list. Entry `i`'s incident edges occupy `offsets[i]..offsets[i+1]`.
//!
//! Both readers construct the graph through the buffered insertion path and
//! flush before returning.

use std::io::{BufRead, Read};

use crate::config::EngineConfig;
use crate::error::{HyperloomError, Result};
use crate::topology::descriptor::{EdgeId, VertexId};
use crate::topology::hypergraph::AdjListHyperGraph;

/// Parse `v,e` pairs from an incidence CSV stream. Blank lines and `#`
/// comments are skipped.
pub fn read_incidence_pairs<R: BufRead>(reader: R) -> Result<Vec<(u64, u64)>> {
    let mut pairs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split(',');
        let (v, e) = match (fields.next(), fields.next(), fields.next()) {
            (Some(v), Some(e), None) => (v.trim(), e.trim()),
            _ => {
                return Err(HyperloomError::Parse {
                    line: lineno + 1,
                    reason: format!("expected `v,e`, got `{trimmed}`"),
                })
            }
        };
        let v: u64 = v.parse().map_err(|_| HyperloomError::Parse {
            line: lineno + 1,
            reason: format!("bad vertex id `{v}`"),
        })?;
        let e: u64 = e.parse().map_err(|_| HyperloomError::Parse {
            line: lineno + 1,
            reason: format!("bad edge id `{e}`"),
        })?;
        pairs.push((v, e));
    }
    Ok(pairs)
}

/// Build a graph from an incidence CSV stream; domain sizes are one past
/// the largest id seen on each side.
pub fn graph_from_incidence_csv<R: BufRead>(
    reader: R,
    cfg: &EngineConfig,
) -> Result<AdjListHyperGraph> {
    let pairs = read_incidence_pairs(reader)?;
    let num_vertices = pairs.iter().map(|&(v, _)| v + 1).max().unwrap_or(0) as usize;
    let num_edges = pairs.iter().map(|&(_, e)| e + 1).max().unwrap_or(0) as usize;
    let graph = AdjListHyperGraph::new(num_vertices, num_edges, cfg);
    for (v, e) in pairs {
        graph.add_inclusion_buffered(VertexId::new(v), EdgeId::new(e))?;
    }
    graph.flush_buffers();
    Ok(graph)
}

/// Read `count` little-endian `u64` values, reporting exactly how much of a
/// short stream arrived.
fn read_u64s<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u64>> {
    let mut buf = vec![0u64; count];
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut buf);
    let mut read = 0;
    while read < bytes.len() {
        match reader.read(&mut bytes[read..])? {
            0 => {
                return Err(HyperloomError::ShortRead {
                    expected: bytes.len(),
                    got: read,
                })
            }
            n => read += n,
        }
    }
    for x in buf.iter_mut() {
        *x = u64::from_le(*x);
    }
    Ok(buf)
}

/// Build a graph from a binary CSR stream.
pub fn graph_from_csr<R: Read>(mut reader: R, cfg: &EngineConfig) -> Result<AdjListHyperGraph> {
    let header = read_u64s(&mut reader, 2)?;
    let (num_vertices, num_edges) = (header[0] as usize, header[1] as usize);
    let offsets = read_u64s(&mut reader, num_vertices + 1)?;
    if offsets.first() != Some(&0) {
        return Err(HyperloomError::MalformedOffsets(
            "offset table must start at 0".into(),
        ));
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(HyperloomError::MalformedOffsets(
            "offset table must be non-decreasing".into(),
        ));
    }
    let adjacency = read_u64s(&mut reader, offsets[num_vertices] as usize)?;

    let graph = AdjListHyperGraph::new(num_vertices, num_edges, cfg);
    for i in 0..num_vertices {
        let v = VertexId::from(i);
        for &raw in &adjacency[offsets[i] as usize..offsets[i + 1] as usize] {
            let e = graph.to_edge(raw)?;
            graph.add_inclusion_buffered(v, e)?;
        }
    }
    graph.flush_buffers();
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn csv_roundtrip_builds_graph() {
        let text = "0,0\n1,0\n# comment\n\n2,1\n";
        let g = graph_from_incidence_csv(Cursor::new(text), &EngineConfig::default()).unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 2);
        assert!(g.has_inclusion(VertexId::new(1), EdgeId::new(0)).unwrap());
        assert!(g.has_inclusion(VertexId::new(2), EdgeId::new(1)).unwrap());
        assert!(!g.has_inclusion(VertexId::new(0), EdgeId::new(1)).unwrap());
    }

    #[test]
    fn csv_rejects_malformed_lines() {
        for bad in ["0;1", "a,1", "1,b", "1,2,3"] {
            let err = graph_from_incidence_csv(Cursor::new(bad), &EngineConfig::default());
            assert!(
                matches!(err, Err(HyperloomError::Parse { line: 1, .. })),
                "input {bad:?}"
            );
        }
    }

    fn csr_bytes(nv: u64, ne: u64, offsets: &[u64], adj: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        for x in [nv, ne].iter().chain(offsets).chain(adj) {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }

    #[test]
    fn csr_roundtrip_builds_graph() {
        // v0 -> {e0, e1}, v1 -> {}, v2 -> {e1}
        let bytes = csr_bytes(3, 2, &[0, 2, 2, 3], &[0, 1, 1]);
        let g = graph_from_csr(Cursor::new(bytes), &EngineConfig::default()).unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(
            g.incident_edges_sorted(VertexId::new(0)).unwrap(),
            vec![EdgeId::new(0), EdgeId::new(1)]
        );
        assert_eq!(g.vertex_degree(VertexId::new(1)).unwrap(), 0);
        assert_eq!(
            g.incident_vertices_sorted(EdgeId::new(1)).unwrap(),
            vec![VertexId::new(0), VertexId::new(2)]
        );
    }

    #[test]
    fn csr_short_stream_reports_byte_counts() {
        let mut bytes = csr_bytes(3, 2, &[0, 2, 2, 3], &[0, 1, 1]);
        bytes.truncate(bytes.len() - 11);
        let err = graph_from_csr(Cursor::new(bytes), &EngineConfig::default());
        assert!(matches!(err, Err(HyperloomError::ShortRead { .. })));
    }

    #[test]
    fn csr_validates_offsets() {
        let bytes = csr_bytes(2, 1, &[0, 2, 1], &[0, 0]);
        assert!(matches!(
            graph_from_csr(Cursor::new(bytes), &EngineConfig::default()),
            Err(HyperloomError::MalformedOffsets(_))
        ));
        let bytes = csr_bytes(2, 1, &[1, 1, 2], &[0, 0]);
        assert!(matches!(
            graph_from_csr(Cursor::new(bytes), &EngineConfig::default()),
            Err(HyperloomError::MalformedOffsets(_))
        ));
    }

    #[test]
    fn csr_rejects_out_of_range_edge() {
        let bytes = csr_bytes(2, 1, &[0, 1, 2], &[0, 5]);
        assert!(matches!(
            graph_from_csr(Cursor::new(bytes), &EngineConfig::default()),
            Err(HyperloomError::InvalidEdge { id: 5, .. })
        ));
    }
}
