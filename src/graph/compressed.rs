//! Memory-efficient undirected graph representation

use std::collections::HashMap;
use std::mem;
use serde::{Serialize, Deserialize};

/// Compressed sparse row representation of a simple undirected graph.
///
/// Every vertex carries two identifiers: the caller-chosen original id
/// (sparse u64) and a dense internal id in `[0, num_nodes)`. All adjacency
/// work uses internal ids; `id_map` and `node_map` translate in both
/// directions.
///
/// Each undirected edge is stored twice, once in each endpoint's row, and
/// counted once in `num_edges`. Neighbor rows are kept sorted ascending
/// within a snapshot so `has_edge` can binary search; callers must not rely
/// on row ordering across mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrGraph {
    /// Number of vertices
    pub num_nodes: usize,

    /// Number of undirected edges (each counted once)
    pub num_edges: usize,

    /// Offset array: `col_idx[row_ptr[v]..row_ptr[v+1]]` is v's neighbor row
    pub row_ptr: Vec<u32>,

    /// Concatenated neighbor rows, both directions of every edge
    pub col_idx: Vec<u32>,

    /// Internal id -> original id
    pub id_map: Vec<u64>,

    /// Original id -> internal id
    pub node_map: HashMap<u64, u32>,
}

impl CsrGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            num_nodes: 0,
            num_edges: 0,
            row_ptr: vec![0],
            col_idx: Vec::new(),
            id_map: Vec::new(),
            node_map: HashMap::new(),
        }
    }

    /// Get the neighbor row of a vertex
    pub fn neighbors(&self, v: u32) -> &[u32] {
        let start = self.row_ptr[v as usize] as usize;
        let end = self.row_ptr[v as usize + 1] as usize;
        &self.col_idx[start..end]
    }

    /// Get the degree of a vertex
    pub fn degree(&self, v: u32) -> usize {
        (self.row_ptr[v as usize + 1] - self.row_ptr[v as usize]) as usize
    }

    /// Check whether u and v are adjacent
    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.neighbors(u).binary_search(&v).is_ok()
    }

    /// Look up the internal id of an original id
    pub fn internal_of(&self, orig_id: u64) -> Option<u32> {
        self.node_map.get(&orig_id).copied()
    }

    /// Look up the original id of an internal id
    pub fn orig_of(&self, internal_id: u32) -> u64 {
        self.id_map[internal_id as usize]
    }

    /// Add an isolated vertex for `orig_id` and return its internal id.
    /// A no-op returning the existing id when `orig_id` is already mapped.
    pub fn add_node(&mut self, orig_id: u64) -> u32 {
        if let Some(&internal) = self.node_map.get(&orig_id) {
            return internal;
        }

        let internal = self.num_nodes as u32;
        self.num_nodes += 1;
        self.id_map.push(orig_id);
        self.node_map.insert(orig_id, internal);
        // Trailing offset equal to |col_idx|: the new row is empty
        self.row_ptr.push(self.col_idx.len() as u32);

        internal
    }

    /// Insert a batch of edges given as internal-id pairs. Self-loops,
    /// already-present edges, and duplicates within the batch are skipped.
    /// The CSR arrays are rebuilt once for the whole batch.
    ///
    /// Returns the edges that were actually inserted.
    pub fn add_edges(&mut self, edges: &[(u32, u32)]) -> Vec<(u32, u32)> {
        let mut fresh: Vec<(u32, u32)> = Vec::new();
        let mut seen: std::collections::HashSet<(u32, u32)> = std::collections::HashSet::new();

        for &(u, v) in edges {
            if u == v {
                continue;
            }
            let key = (u.min(v), u.max(v));
            if seen.contains(&key) || self.has_edge(u, v) {
                continue;
            }
            seen.insert(key);
            fresh.push((u, v));
        }

        if fresh.is_empty() {
            return fresh;
        }

        // Count new neighbors per row
        let mut added = vec![0u32; self.num_nodes];
        for &(u, v) in &fresh {
            added[u as usize] += 1;
            added[v as usize] += 1;
        }

        // Rebuild row_ptr, then move rows into a fresh col_idx
        let mut new_row_ptr = Vec::with_capacity(self.num_nodes + 1);
        new_row_ptr.push(0u32);
        for v in 0..self.num_nodes {
            let old_len = self.row_ptr[v + 1] - self.row_ptr[v];
            new_row_ptr.push(new_row_ptr[v] + old_len + added[v]);
        }

        let mut new_col_idx = vec![0u32; *new_row_ptr.last().unwrap() as usize];
        let mut cursor: Vec<u32> = new_row_ptr[..self.num_nodes].to_vec();

        for v in 0..self.num_nodes {
            let start = self.row_ptr[v] as usize;
            let end = self.row_ptr[v + 1] as usize;
            let len = end - start;
            let dst = cursor[v] as usize;
            new_col_idx[dst..dst + len].copy_from_slice(&self.col_idx[start..end]);
            cursor[v] += len as u32;
        }

        for &(u, v) in &fresh {
            new_col_idx[cursor[u as usize] as usize] = v;
            cursor[u as usize] += 1;
            new_col_idx[cursor[v as usize] as usize] = u;
            cursor[v as usize] += 1;
        }

        self.row_ptr = new_row_ptr;
        self.col_idx = new_col_idx;
        self.num_edges += fresh.len();

        // Re-sort only the rows that grew
        for v in 0..self.num_nodes {
            if added[v] > 0 {
                let start = self.row_ptr[v] as usize;
                let end = self.row_ptr[v + 1] as usize;
                self.col_idx[start..end].sort_unstable();
            }
        }

        fresh
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let row_ptr = self.row_ptr.capacity() * mem::size_of::<u32>();
        let col_idx = self.col_idx.capacity() * mem::size_of::<u32>();
        let id_map = self.id_map.capacity() * mem::size_of::<u64>();
        let node_map = self.node_map.capacity() * (mem::size_of::<u64>() + mem::size_of::<u32>());

        base + row_ptr + col_idx + id_map + node_map
    }
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self::new()
    }
}
