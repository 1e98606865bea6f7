//! Incremental core-number maintenance for edge insertion

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::graph::CsrGraph;

/// Update `core` in place after `new_edges` were inserted into `graph`,
/// returning every vertex whose core number increased.
///
/// Promotion-only: insertions never lower a core number, and a vertex moves
/// up one level at a time. The first pass seeds the endpoints sitting at
/// the batch's highest endpoint core level and expands through a
/// min-priority queue; follow-up passes re-seed all endpoints plus
/// everything promoted so far until a pass promotes nothing, so chains of
/// promotions triggered by a single batch settle to a fixed point.
pub(crate) fn update_core_numbers(
    graph: &CsrGraph,
    core: &mut [u32],
    max_core: &mut u32,
    new_edges: &[(u32, u32)],
) -> HashSet<u32> {
    let mut promoted: HashSet<u32> = HashSet::new();
    if new_edges.is_empty() {
        return promoted;
    }

    let mut endpoints: Vec<u32> = new_edges.iter().flat_map(|&(u, v)| [u, v]).collect();
    endpoints.sort_unstable();
    endpoints.dedup();

    let k_max = endpoints.iter().map(|&v| core[v as usize]).max().unwrap();
    let seeds: Vec<u32> = endpoints
        .iter()
        .copied()
        .filter(|&v| core[v as usize] >= k_max)
        .collect();
    promoted.extend(promote_pass(graph, core, max_core, &seeds));

    loop {
        let mut seeds = endpoints.clone();
        seeds.extend(promoted.iter().copied());
        seeds.sort_unstable();
        seeds.dedup();

        let round = promote_pass(graph, core, max_core, &seeds);
        if round.is_empty() {
            break;
        }
        promoted.extend(round);
    }

    promoted
}

/// One queue-driven expansion over `seeds`. A vertex at level k is promoted
/// when at least k+1 of its neighbors sit at level k+1 or above; promoting
/// it re-enqueues its level-k neighbors. Each vertex is examined once per
/// pass, smallest core level first.
fn promote_pass(
    graph: &CsrGraph,
    core: &mut [u32],
    max_core: &mut u32,
    seeds: &[u32],
) -> Vec<u32> {
    let mut queue: BinaryHeap<Reverse<(u32, u32)>> =
        seeds.iter().map(|&v| Reverse((core[v as usize], v))).collect();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut promoted = Vec::new();

    while let Some(Reverse((_, v))) = queue.pop() {
        if !visited.insert(v) {
            continue;
        }

        let k = core[v as usize];
        let upper_neighbors = graph
            .neighbors(v)
            .iter()
            .filter(|&&w| core[w as usize] >= k + 1)
            .count();

        if upper_neighbors as u32 >= k + 1 {
            core[v as usize] = k + 1;
            *max_core = (*max_core).max(k + 1);
            promoted.push(v);

            for &w in graph.neighbors(v) {
                if core[w as usize] == k && !visited.contains(&w) {
                    queue.push(Reverse((k, w)));
                }
            }
        }
    }

    promoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::graph::algorithms::core_decomposition;

    fn graph_from(edges: &[(u64, u64)]) -> CsrGraph {
        let mut b = GraphBuilder::new();
        for &(u, v) in edges {
            b.add_edge(u, v);
        }
        b.build()
    }

    fn insert_and_update(graph: &mut CsrGraph, core: &mut Vec<u32>, edges: &[(u32, u32)]) -> HashSet<u32> {
        let inserted = graph.add_edges(edges);
        let mut max_core = core.iter().copied().max().unwrap_or(0);
        update_core_numbers(graph, core, &mut max_core, &inserted)
    }

    #[test]
    fn pendant_tucked_into_a_triangle_is_promoted() {
        // triangle {1,2,3} with pendant 4 on 3; adding (4,1) gives 4 two
        // neighbors inside the 2-core
        let mut g = graph_from(&[(1, 2), (2, 3), (1, 3), (3, 4)]);
        let d = core_decomposition(&g);
        let mut core = d.core;
        assert_eq!(core, vec![2, 2, 2, 1]);

        let v4 = g.internal_of(4).unwrap();
        let v1 = g.internal_of(1).unwrap();
        let promoted = insert_and_update(&mut g, &mut core, &[(v4, v1)]);

        assert_eq!(core, vec![2, 2, 2, 2]);
        let expected: HashSet<u32> = [v4].into_iter().collect();
        assert_eq!(promoted, expected);

        let fresh = core_decomposition(&g);
        assert_eq!(core, fresh.core);
    }

    #[test]
    fn bridge_between_cores_promotes_nothing() {
        let mut g = graph_from(&[(1, 2), (2, 3), (1, 3), (4, 5), (5, 6), (4, 6)]);
        let d = core_decomposition(&g);
        let mut core = d.core;

        let v3 = g.internal_of(3).unwrap();
        let v4 = g.internal_of(4).unwrap();
        let promoted = insert_and_update(&mut g, &mut core, &[(v3, v4)]);

        assert!(promoted.is_empty());
        assert!(core.iter().all(|&c| c == 2));
    }

    #[test]
    fn mixed_level_batch_promotes_the_low_end_too() {
        // a 4-clique with pendant 5, and a separate triangle with pendant 9;
        // one batch tucks both pendants into their cores. The first pass
        // seeds only at the batch's top core level, so the low-end
        // promotion relies on the widened follow-up passes.
        let mut g = graph_from(&[
            (1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4), // K4
            (4, 5), // fringe of the clique
            (6, 7), (7, 8), (6, 8), (8, 9), // triangle with pendant
        ]);
        let d = core_decomposition(&g);
        let mut core = d.core;

        let v5 = g.internal_of(5).unwrap();
        let v1 = g.internal_of(1).unwrap();
        let v9 = g.internal_of(9).unwrap();
        let v6 = g.internal_of(6).unwrap();
        let promoted = insert_and_update(&mut g, &mut core, &[(v5, v1), (v9, v6)]);

        assert_eq!(core[v5 as usize], 2);
        assert_eq!(core[v9 as usize], 2);
        assert!(promoted.contains(&v5) && promoted.contains(&v9));

        // updated cores match a from-scratch decomposition
        let fresh = core_decomposition(&g);
        assert_eq!(core, fresh.core);
    }

    #[test]
    fn cores_never_decrease_across_updates() {
        let mut g = graph_from(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let mut core = core_decomposition(&g).core;

        for edges in [&[(0u32, 2u32)][..], &[(1, 3)], &[(0, 4)], &[(2, 4)]] {
            let before = core.clone();
            insert_and_update(&mut g, &mut core, edges);
            assert!(core.iter().zip(&before).all(|(now, then)| now >= then));
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let g = graph_from(&[(1, 2)]);
        let mut core = vec![1, 1];
        let mut max_core = 1;
        let promoted = update_core_numbers(&g, &mut core, &mut max_core, &[]);
        assert!(promoted.is_empty());
        assert_eq!(core, vec![1, 1]);
    }
}
