//! Induced subgraph extraction with identity preservation

use std::collections::HashSet;
use crate::graph::CsrGraph;

/// Extract the subgraph induced by `selection`, a list of internal ids of
/// `graph`. Vertex `i` of the result corresponds to `selection[i]`, and the
/// original-id mapping is carried over: `result.id_map[i] =
/// graph.id_map[selection[i]]`. Edges survive iff both endpoints are
/// selected.
pub fn induced_subgraph(graph: &CsrGraph, selection: &[u32]) -> CsrGraph {
    if selection.is_empty() {
        return CsrGraph::new();
    }

    let n = selection.len();

    // Remap table from source internal ids to subgraph internal ids
    let mut remap = vec![u32::MAX; graph.num_nodes];
    for (new_id, &old_id) in selection.iter().enumerate() {
        remap[old_id as usize] = new_id as u32;
    }

    // Count surviving neighbors per selected vertex
    let mut counts = vec![0u32; n];
    for (new_id, &old_id) in selection.iter().enumerate() {
        for &w in graph.neighbors(old_id) {
            if remap[w as usize] != u32::MAX {
                counts[new_id] += 1;
            }
        }
    }

    let mut row_ptr = Vec::with_capacity(n + 1);
    row_ptr.push(0u32);
    for new_id in 0..n {
        row_ptr.push(row_ptr[new_id] + counts[new_id]);
    }

    let mut col_idx = vec![0u32; *row_ptr.last().unwrap() as usize];
    let mut cursor: Vec<u32> = row_ptr[..n].to_vec();

    for (new_id, &old_id) in selection.iter().enumerate() {
        for &w in graph.neighbors(old_id) {
            let mapped = remap[w as usize];
            if mapped != u32::MAX {
                col_idx[cursor[new_id] as usize] = mapped;
                cursor[new_id] += 1;
            }
        }
    }

    // Remapping scrambles row order; restore the sorted-row invariant
    for new_id in 0..n {
        let start = row_ptr[new_id] as usize;
        let end = row_ptr[new_id + 1] as usize;
        col_idx[start..end].sort_unstable();
    }

    let id_map: Vec<u64> = selection.iter().map(|&old| graph.id_map[old as usize]).collect();
    let node_map = id_map
        .iter()
        .enumerate()
        .map(|(internal, &orig)| (orig, internal as u32))
        .collect();

    let num_edges = col_idx.len() / 2;

    CsrGraph {
        num_nodes: n,
        num_edges,
        row_ptr,
        col_idx,
        id_map,
        node_map,
    }
}

/// Drop `remove` from the graph and compact internal ids, preserving the
/// original-id mapping of the survivors. Survivors keep their relative
/// order.
pub fn remove_and_compact(graph: &CsrGraph, remove: &HashSet<u32>) -> CsrGraph {
    let remaining: Vec<u32> = (0..graph.num_nodes as u32)
        .filter(|v| !remove.contains(v))
        .collect();
    induced_subgraph(graph, &remaining)
}
