//! Streaming IKC: incremental maintenance of a clustering under edge and
//! node additions

mod update;

use std::collections::HashSet;
use std::time::Instant;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::cluster::Cluster;
use crate::cluster::detection::iterative_kcore_clustering;
use crate::cluster::metrics::simplified_modularity;
use crate::graph::CsrGraph;
use crate::graph::algorithms::core_decomposition;
use crate::graph::subgraph::induced_subgraph;

/// Statistics for the most recent streaming edge update
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateStats {
    /// Vertices whose core number rose, plus endpoints of inserted edges
    pub affected_nodes: usize,

    /// Clusters invalidated (k-validity lost or merge candidates found)
    pub invalidated_clusters: usize,

    /// Clusters carried forward untouched
    pub valid_clusters: usize,

    /// Size of the recompute pool handed to localized re-clustering
    pub merge_candidates: usize,

    /// Wall time of the localized recompute
    pub recompute_time_ms: f64,

    /// Wall time of the whole update
    pub total_time_ms: f64,
}

/// Incrementally maintained IKC state.
///
/// Owns the mutable graph, the frozen original snapshot used for
/// modularity, the cluster set, per-vertex core numbers, and the
/// vertex-to-cluster assignment. Edge insertions trigger incremental core
/// maintenance, cluster invalidation analysis, and localized re-clustering
/// of the affected region; everything else is carried forward unchanged.
pub struct StreamingIkc {
    graph: CsrGraph,
    origin: CsrGraph,
    min_k: u32,
    clusters: Vec<Cluster>,
    core: Vec<u32>,
    max_core: u32,
    assignment: Vec<Option<u32>>,
    initialized: bool,
    batch_mode: bool,
    pending_edges: Vec<(u64, u64)>,
    pending_nodes: Vec<u64>,
    last_stats: UpdateStats,
}

impl StreamingIkc {
    /// Take ownership of a graph and freeze its snapshot for modularity
    pub fn new(graph: CsrGraph, min_k: u32) -> Self {
        let origin = graph.clone();
        let num_nodes = graph.num_nodes;
        Self {
            graph,
            origin,
            min_k,
            clusters: Vec::new(),
            core: Vec::new(),
            max_core: 0,
            assignment: vec![None; num_nodes],
            initialized: false,
            batch_mode: false,
            pending_edges: Vec::new(),
            pending_nodes: Vec::new(),
            last_stats: UpdateStats::default(),
        }
    }

    /// Run the initial batch clustering and set up incremental state
    pub fn initial_clustering(&mut self) -> &[Cluster] {
        log::info!(
            "initial clustering: {} nodes, {} edges, min_k={}",
            self.graph.num_nodes,
            self.graph.num_edges,
            self.min_k
        );

        self.clusters = iterative_kcore_clustering(
            self.graph.clone(),
            self.min_k,
            &self.origin,
            &simplified_modularity,
            None,
        );

        let decomposition = core_decomposition(&self.graph);
        self.core = decomposition.core;
        self.max_core = decomposition.max_core;
        self.rebuild_assignment();
        self.initialized = true;

        log::info!(
            "initial clustering complete: {} clusters, max_core={}",
            self.clusters.len(),
            self.max_core
        );

        &self.clusters
    }

    /// Insert edges given as original-id pairs and update the clustering.
    ///
    /// Lenient: an edge whose endpoints are not both present is skipped
    /// with a warning. Use [`update`](Self::update) to add edges together
    /// with their vertices under strict validation.
    pub fn add_edges(&mut self, edges: &[(u64, u64)]) -> Result<&[Cluster]> {
        self.ensure_initialized("add_edges")?;

        if self.batch_mode {
            self.pending_edges.extend_from_slice(edges);
            return Ok(&self.clusters);
        }

        let mut internal = Vec::with_capacity(edges.len());
        for &(u_orig, v_orig) in edges {
            match (self.graph.internal_of(u_orig), self.graph.internal_of(v_orig)) {
                (Some(u), Some(v)) => internal.push((u, v)),
                _ => {
                    log::warn!(
                        "skipping edge ({}, {}): endpoint not in graph",
                        u_orig,
                        v_orig
                    );
                }
            }
        }

        self.apply_edges(&internal);
        Ok(&self.clusters)
    }

    /// Append isolated vertices. Each becomes a singleton cluster with
    /// `k_value = 0` unless it is already assigned.
    pub fn add_nodes(&mut self, nodes: &[u64]) -> Result<&[Cluster]> {
        self.ensure_initialized("add_nodes")?;

        if self.batch_mode {
            self.pending_nodes.extend_from_slice(nodes);
            return Ok(&self.clusters);
        }

        self.insert_isolated(nodes);
        self.emit_unassigned_singletons(nodes);
        Ok(&self.clusters)
    }

    /// Add vertices and edges in one strict operation. Every edge endpoint
    /// must already exist or be listed in `nodes`; otherwise the update is
    /// rejected as a whole. Vertices that end up in no recomputed cluster
    /// become singletons.
    pub fn update(&mut self, edges: &[(u64, u64)], nodes: &[u64]) -> Result<&[Cluster]> {
        self.ensure_initialized("update")?;

        if self.batch_mode {
            self.pending_edges.extend_from_slice(edges);
            self.pending_nodes.extend_from_slice(nodes);
            return Ok(&self.clusters);
        }

        let incoming: HashSet<u64> = nodes.iter().copied().collect();
        for &(u, v) in edges {
            let u_known = self.graph.internal_of(u).is_some() || incoming.contains(&u);
            let v_known = self.graph.internal_of(v).is_some() || incoming.contains(&v);
            if !u_known || !v_known {
                bail!(
                    "edge ({}, {}) references unknown vertices; every endpoint must \
                     exist in the graph or be listed in the nodes argument",
                    u,
                    v
                );
            }
        }

        self.insert_isolated(nodes);

        if !edges.is_empty() {
            let internal: Vec<(u32, u32)> = edges
                .iter()
                .map(|&(u, v)| {
                    // validated above, lookups cannot fail
                    (
                        self.graph.internal_of(u).unwrap(),
                        self.graph.internal_of(v).unwrap(),
                    )
                })
                .collect();
            self.apply_edges(&internal);
        }

        self.emit_unassigned_singletons(nodes);
        Ok(&self.clusters)
    }

    /// Enter batch mode: subsequent additions accumulate without any
    /// recomputation until [`commit_batch`](Self::commit_batch).
    pub fn begin_batch(&mut self) -> Result<()> {
        self.ensure_initialized("begin_batch")?;
        self.batch_mode = true;
        self.pending_edges.clear();
        self.pending_nodes.clear();
        Ok(())
    }

    /// Leave batch mode and apply everything accumulated as one update.
    /// Outside batch mode this warns and changes nothing.
    pub fn commit_batch(&mut self) -> Result<&[Cluster]> {
        self.ensure_initialized("commit_batch")?;

        if !self.batch_mode {
            log::warn!("commit_batch called outside batch mode, ignoring");
            return Ok(&self.clusters);
        }

        self.batch_mode = false;
        let edges = std::mem::take(&mut self.pending_edges);
        let nodes = std::mem::take(&mut self.pending_nodes);

        log::info!(
            "committing batch: {} edges, {} nodes",
            edges.len(),
            nodes.len()
        );

        self.update(&edges, &nodes)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn core_numbers(&self) -> &[u32] {
        &self.core
    }

    pub fn max_core(&self) -> u32 {
        self.max_core
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.graph.num_edges
    }

    pub fn graph(&self) -> &CsrGraph {
        &self.graph
    }

    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode
    }

    pub fn last_stats(&self) -> &UpdateStats {
        &self.last_stats
    }

    /// Cluster index currently containing an original id, if any
    pub fn cluster_of(&self, orig_id: u64) -> Option<u32> {
        let internal = self.graph.internal_of(orig_id)?;
        self.assignment[internal as usize]
    }

    fn ensure_initialized(&self, operation: &str) -> Result<()> {
        if !self.initialized {
            bail!("{} requires initial_clustering to have run", operation);
        }
        Ok(())
    }

    /// Append vertices as isolated nodes without touching the clustering
    fn insert_isolated(&mut self, nodes: &[u64]) {
        for &orig in nodes {
            if self.graph.internal_of(orig).is_none() {
                self.graph.add_node(orig);
                self.core.push(0);
                self.assignment.push(None);
            }
        }
    }

    /// Singleton clusters for the given vertices where still unassigned
    fn emit_unassigned_singletons(&mut self, nodes: &[u64]) {
        for &orig in nodes {
            let internal = match self.graph.internal_of(orig) {
                Some(v) => v,
                None => continue,
            };
            if self.assignment[internal as usize].is_none() {
                let index = self.clusters.len() as u32;
                self.clusters.push(Cluster::new(vec![orig], 0, 0.0));
                self.assignment[internal as usize] = Some(index);
            }
        }
    }

    /// Mutate the graph, maintain core numbers, and re-cluster the
    /// affected region. `edges` are internal-id pairs whose endpoints all
    /// exist.
    fn apply_edges(&mut self, edges: &[(u32, u32)]) {
        let start = Instant::now();

        let inserted = self.graph.add_edges(edges);
        if inserted.is_empty() {
            return;
        }

        let promoted =
            update::update_core_numbers(&self.graph, &mut self.core, &mut self.max_core, &inserted);

        // Invalidation works on the touched set: promotions plus the
        // endpoints of edges that actually went in. A bridge between two
        // cores promotes nobody yet still has to re-open both sides.
        let mut touched = promoted;
        for &(u, v) in &inserted {
            touched.insert(u);
            touched.insert(v);
        }

        let recompute_start = Instant::now();
        let (valid, invalid, pool) = self.partition_clusters(&touched);

        self.last_stats = UpdateStats {
            affected_nodes: touched.len(),
            invalidated_clusters: invalid.len(),
            valid_clusters: valid.len(),
            merge_candidates: pool.len(),
            recompute_time_ms: 0.0,
            total_time_ms: 0.0,
        };

        if !pool.is_empty() {
            let mut pool_vec: Vec<u32> = pool.iter().copied().collect();
            pool_vec.sort_unstable();

            let region = induced_subgraph(&self.graph, &pool_vec);

            // The region decomposition is a lower bound on full-graph core
            // numbers; folding it in tightens the promotion-only estimate
            // (a K4 assembled in one batch promotes nobody on its own).
            let region_cores = core_decomposition(&region);
            for (local, &v) in pool_vec.iter().enumerate() {
                let tightened = self.core[v as usize].max(region_cores.core[local]);
                self.core[v as usize] = tightened;
                self.max_core = self.max_core.max(tightened);
            }

            log::info!("recomputing {} pooled vertices", pool_vec.len());
            let recomputed = iterative_kcore_clustering(
                region,
                self.min_k,
                &self.origin,
                &simplified_modularity,
                None,
            );

            let mut next = Vec::with_capacity(valid.len() + recomputed.len());
            for index in valid {
                next.push(self.clusters[index].clone());
            }
            next.extend(recomputed);
            self.clusters = next;
            self.rebuild_assignment();
        }

        self.last_stats.recompute_time_ms = recompute_start.elapsed().as_secs_f64() * 1e3;
        self.last_stats.total_time_ms = start.elapsed().as_secs_f64() * 1e3;

        log::info!(
            "update: {} affected, {} invalidated, {} valid, {} clusters total",
            self.last_stats.affected_nodes,
            self.last_stats.invalidated_clusters,
            self.last_stats.valid_clusters,
            self.clusters.len()
        );
    }

    /// Partition clusters into carried-forward and invalidated sets and
    /// collect the recompute pool.
    ///
    /// A cluster is untouched when none of its members is in `touched`.
    /// A touched cluster is invalid when k-validity at its own k is lost,
    /// or when it has an external neighbor at that core level (a merge
    /// candidate); the merge case also pools those neighbors. Touched
    /// vertices that belong to no cluster are pooled directly, and the
    /// pool is closed so that no carried-forward cluster overlaps it.
    fn partition_clusters(
        &self,
        touched: &HashSet<u32>,
    ) -> (Vec<usize>, Vec<usize>, HashSet<u32>) {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut pool: HashSet<u32> = HashSet::new();

        for (index, cluster) in self.clusters.iter().enumerate() {
            let members: Vec<u32> = cluster
                .nodes
                .iter()
                .filter_map(|&orig| self.graph.internal_of(orig))
                .collect();
            let member_set: HashSet<u32> = members.iter().copied().collect();

            if !members.iter().any(|v| touched.contains(v)) {
                valid.push(index);
                continue;
            }

            let k = cluster.k_value;

            let k_valid = members.iter().all(|&v| {
                let inside = self
                    .graph
                    .neighbors(v)
                    .iter()
                    .filter(|w| member_set.contains(w))
                    .count();
                inside as u32 >= k
            });

            if !k_valid {
                invalid.push(index);
                pool.extend(&members);
                continue;
            }

            let mut merge_candidates: Vec<u32> = Vec::new();
            for &v in &members {
                for &w in self.graph.neighbors(v) {
                    if !member_set.contains(&w) && self.core[w as usize] >= k {
                        merge_candidates.push(w);
                    }
                }
            }

            if merge_candidates.is_empty() {
                valid.push(index);
            } else {
                invalid.push(index);
                pool.extend(&members);
                pool.extend(merge_candidates);
            }
        }

        // Brand-new vertices touched by this batch may not be in any
        // cluster yet; they must be clustered by the recompute.
        for &v in touched {
            if self.assignment.get(v as usize).copied().flatten().is_none() {
                pool.insert(v);
            }
        }

        // Close the pool over carried-forward clusters so the final set
        // stays a partition: a member pulled in as someone's merge
        // candidate drags its whole cluster along.
        loop {
            let mut changed = false;
            valid.retain(|&index| {
                let overlaps = self.clusters[index]
                    .nodes
                    .iter()
                    .filter_map(|&orig| self.graph.internal_of(orig))
                    .any(|v| pool.contains(&v));
                if overlaps {
                    invalid.push(index);
                    for &orig in &self.clusters[index].nodes {
                        if let Some(v) = self.graph.internal_of(orig) {
                            changed |= pool.insert(v);
                        }
                    }
                }
                !overlaps
            });
            if !changed {
                break;
            }
        }

        (valid, invalid, pool)
    }

    fn rebuild_assignment(&mut self) {
        self.assignment = vec![None; self.graph.num_nodes];
        for (index, cluster) in self.clusters.iter().enumerate() {
            for &orig in &cluster.nodes {
                if let Some(v) = self.graph.internal_of(orig) {
                    self.assignment[v as usize] = Some(index as u32);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn graph_from(edges: &[(u64, u64)]) -> CsrGraph {
        let mut b = GraphBuilder::new();
        for &(u, v) in edges {
            b.add_edge(u, v);
        }
        b.build()
    }

    fn sorted_sets(clusters: &[Cluster]) -> Vec<Vec<u64>> {
        let mut sets: Vec<Vec<u64>> = clusters
            .iter()
            .map(|c| {
                let mut nodes = c.nodes.clone();
                nodes.sort_unstable();
                nodes
            })
            .collect();
        sets.sort();
        sets
    }

    fn assert_matches_batch(streaming: &StreamingIkc) {
        let from_scratch = iterative_kcore_clustering(
            streaming.graph().clone(),
            streaming.min_k,
            &streaming.origin,
            &simplified_modularity,
            None,
        );
        assert_eq!(
            sorted_sets(streaming.clusters()),
            sorted_sets(&from_scratch),
            "streaming clusters diverged from a from-scratch run"
        );
    }

    fn two_triangles() -> StreamingIkc {
        let g = graph_from(&[(1, 2), (2, 3), (1, 3), (4, 5), (5, 6), (4, 6)]);
        let mut s = StreamingIkc::new(g, 2);
        s.initial_clustering();
        s
    }

    #[test]
    fn bridging_edge_merges_the_triangles() {
        let mut s = two_triangles();
        assert_eq!(s.clusters().len(), 2);

        s.add_edges(&[(3, 4)]).unwrap();

        assert_eq!(s.clusters().len(), 1);
        assert_eq!(sorted_sets(s.clusters()), vec![vec![1, 2, 3, 4, 5, 6]]);
        assert_eq!(s.clusters()[0].k_value, 2);

        let stats = s.last_stats();
        assert!(stats.affected_nodes >= 2);
        assert_eq!(stats.invalidated_clusters, 2);
        assert_eq!(stats.valid_clusters, 0);
        assert_eq!(stats.merge_candidates, 6);

        assert_matches_batch(&s);
    }

    #[test]
    fn low_degree_edge_leaves_existing_cluster_alone() {
        // 4-clique at min_k = 3; a new edge between two new vertices cannot
        // form a cluster
        let g = graph_from(&[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]);
        let mut s = StreamingIkc::new(g, 3);
        s.initial_clustering();
        assert_eq!(s.clusters().len(), 1);

        s.add_nodes(&[5, 6]).unwrap();
        s.add_edges(&[(5, 6)]).unwrap();

        let sets = sorted_sets(s.clusters());
        assert!(sets.contains(&vec![1, 2, 3, 4]));
        assert!(sets.contains(&vec![5]));
        assert!(sets.contains(&vec![6]));
        let clique = s
            .clusters()
            .iter()
            .find(|c| c.len() == 4)
            .expect("clique cluster survives");
        assert_eq!(clique.k_value, 3);
        for singleton in s.clusters().iter().filter(|c| c.len() == 1) {
            assert_eq!(singleton.k_value, 0);
        }

        assert_matches_batch(&s);
    }

    #[test]
    fn batch_mode_commit_equals_single_update() {
        let mut batched = two_triangles();
        batched.begin_batch().unwrap();
        assert!(batched.is_batch_mode());
        batched.add_edges(&[(3, 4)]).unwrap();
        batched.add_nodes(&[7, 8]).unwrap();
        batched.add_edges(&[(7, 8)]).unwrap();
        batched.commit_batch().unwrap();
        assert!(!batched.is_batch_mode());

        let mut direct = two_triangles();
        direct.update(&[(3, 4), (7, 8)], &[7, 8]).unwrap();

        assert_eq!(sorted_sets(batched.clusters()), sorted_sets(direct.clusters()));
        assert_matches_batch(&batched);
    }

    #[test]
    fn update_rejects_edges_with_unknown_endpoints() {
        let mut s = two_triangles();
        let err = s.update(&[(1, 99)], &[]).unwrap_err();
        assert!(err.to_string().contains("(1, 99)"));

        // the same edge passes when the vertex comes along
        s.update(&[(1, 99)], &[99]).unwrap();
        assert!(s.cluster_of(99).is_some());
    }

    #[test]
    fn add_edges_skips_unknown_endpoints_leniently() {
        let mut s = two_triangles();
        let before = sorted_sets(s.clusters());
        s.add_edges(&[(1, 77), (77, 88)]).unwrap();
        assert_eq!(sorted_sets(s.clusters()), before);
        assert_eq!(s.num_nodes(), 6);
    }

    #[test]
    fn commit_outside_batch_mode_is_a_warned_no_op() {
        let mut s = two_triangles();
        let before = sorted_sets(s.clusters());
        s.commit_batch().unwrap();
        assert_eq!(sorted_sets(s.clusters()), before);
    }

    #[test]
    fn mutators_require_initialization() {
        let g = graph_from(&[(1, 2), (2, 3), (1, 3)]);
        let mut s = StreamingIkc::new(g, 2);
        assert!(s.add_edges(&[(1, 2)]).is_err());
        assert!(s.update(&[], &[4]).is_err());
        assert!(s.begin_batch().is_err());

        s.initial_clustering();
        assert!(s.add_edges(&[(1, 2)]).is_ok());
    }

    #[test]
    fn added_nodes_become_singletons_once() {
        let mut s = two_triangles();
        s.add_nodes(&[10, 11]).unwrap();
        s.add_nodes(&[10]).unwrap();

        assert_eq!(s.num_nodes(), 8);
        let singletons: Vec<_> = s.clusters().iter().filter(|c| c.nodes == vec![10]).collect();
        assert_eq!(singletons.len(), 1);
        assert!(s.cluster_of(10).is_some());
    }

    #[test]
    fn clique_assembled_in_one_update_is_clustered() {
        // all of K4 lands in a single update on an unrelated base graph
        let g = graph_from(&[(1, 2), (2, 3), (1, 3)]);
        let mut s = StreamingIkc::new(g, 2);
        s.initial_clustering();

        s.update(
            &[(10, 11), (10, 12), (10, 13), (11, 12), (11, 13), (12, 13)],
            &[10, 11, 12, 13],
        )
        .unwrap();

        let sets = sorted_sets(s.clusters());
        assert!(sets.contains(&vec![10, 11, 12, 13]));
        let clique = s.clusters().iter().find(|c| c.len() == 4).unwrap();
        assert_eq!(clique.k_value, 3);

        assert_matches_batch(&s);
    }

    #[test]
    fn growing_a_clique_one_vertex_at_a_time_tracks_batch() {
        let g = graph_from(&[(1, 2), (2, 3), (1, 3)]);
        let mut s = StreamingIkc::new(g, 2);
        s.initial_clustering();

        for new in 4..=7u64 {
            let edges: Vec<(u64, u64)> = (1..new).map(|old| (new, old)).collect();
            s.update(&edges, &[new]).unwrap();
            assert_matches_batch(&s);
        }

        assert_eq!(s.clusters().len(), 1);
        assert_eq!(s.clusters()[0].k_value, 6);
        assert_eq!(s.max_core(), 6);
    }

    #[test]
    fn core_numbers_are_monotone_across_updates() {
        let mut s = two_triangles();
        let mut previous = s.core_numbers().to_vec();

        for edges in [&[(3u64, 4u64)][..], &[(2, 5)], &[(1, 6)]] {
            s.add_edges(edges).unwrap();
            let current = s.core_numbers();
            assert!(previous
                .iter()
                .zip(current)
                .all(|(then, now)| now >= then));
            previous = current.to_vec();
        }
    }

    #[test]
    fn clusters_stay_a_partition_after_updates() {
        let mut s = two_triangles();
        s.add_nodes(&[7]).unwrap();
        s.add_edges(&[(3, 4), (7, 1), (7, 2)]).unwrap();

        let mut seen: Vec<u64> = s
            .clusters()
            .iter()
            .flat_map(|c| c.nodes.iter().copied())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), s.num_nodes());
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
