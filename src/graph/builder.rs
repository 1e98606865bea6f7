//! Graph construction module

use std::collections::HashMap;
use crate::graph::CsrGraph;

/// Builder for incrementally constructing a `CsrGraph` from edges given as
/// original-id pairs. Self-loops are dropped on insert; duplicate pairs (in
/// either order) are deduplicated when the CSR is built.
pub struct GraphBuilder {
    /// Mapping from original ids to internal ids
    node_map: HashMap<u64, u32>,

    /// Internal id -> original id
    id_map: Vec<u64>,

    /// Adjacency list per vertex, both directions
    adjacency: Vec<Vec<u32>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a builder with pre-allocated node capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            node_map: HashMap::with_capacity(capacity),
            id_map: Vec::with_capacity(capacity),
            adjacency: Vec::with_capacity(capacity),
        }
    }

    /// Get or create the internal id for an original id
    pub fn add_node(&mut self, orig_id: u64) -> u32 {
        if let Some(&internal) = self.node_map.get(&orig_id) {
            return internal;
        }

        let internal = self.id_map.len() as u32;
        self.node_map.insert(orig_id, internal);
        self.id_map.push(orig_id);
        self.adjacency.push(Vec::new());

        internal
    }

    /// Add an undirected edge between two original ids. Self-loops are ignored.
    pub fn add_edge(&mut self, u_orig: u64, v_orig: u64) {
        if u_orig == v_orig {
            return;
        }

        let u = self.add_node(u_orig);
        let v = self.add_node(v_orig);
        self.adjacency[u as usize].push(v);
        self.adjacency[v as usize].push(u);
    }

    /// Build the compressed graph. Each neighbor row is sorted and
    /// deduplicated; `num_edges` counts each undirected edge once.
    pub fn build(mut self) -> CsrGraph {
        let num_nodes = self.adjacency.len();

        for row in &mut self.adjacency {
            row.sort_unstable();
            row.dedup();
        }

        let total: usize = self.adjacency.iter().map(|row| row.len()).sum();

        let mut row_ptr = Vec::with_capacity(num_nodes + 1);
        row_ptr.push(0u32);
        let mut col_idx = Vec::with_capacity(total);

        for row in &self.adjacency {
            col_idx.extend_from_slice(row);
            row_ptr.push(col_idx.len() as u32);
        }

        CsrGraph {
            num_nodes,
            num_edges: total / 2,
            row_ptr,
            col_idx,
            id_map: self.id_map,
            node_map: self.node_map,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
