//! Iterative k-core clustering

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log;
use rayon::prelude::*;

use crate::cluster::Cluster;
use crate::cluster::metrics::{self, ModularityFn};
use crate::graph::CsrGraph;
use crate::graph::algorithms::{core_decomposition, connected_components, vertices_in_core};
use crate::graph::subgraph::{induced_subgraph, remove_and_compact};

/// Optional per-iteration hook, invoked with the current maximum core
/// number. Successive calls observe a non-increasing sequence down toward
/// `min_k`.
pub type ProgressFn = dyn Fn(u32) + Sync;

/// Cluster a graph by iterated max-core peeling.
///
/// Each round decomposes the working graph, extracts the maximum k-core,
/// splits it into connected components, and filters every component through
/// k-validity (against `min_k`) and the modularity predicate. Passing
/// components are emitted as clusters carrying that round's `max_k`;
/// failing components are pooled for singleton emission. The working graph
/// is then compacted and the loop continues until it is exhausted or its
/// maximum core falls below `min_k`, at which point all residual vertices
/// and the pool are emitted as singletons scored against `origin`.
///
/// `origin` is the unpeeled graph snapshot the modularity predicate and the
/// singleton scores refer to.
pub fn iterative_kcore_clustering(
    graph: CsrGraph,
    min_k: u32,
    origin: &CsrGraph,
    modularity: &ModularityFn,
    progress: Option<&ProgressFn>,
) -> Vec<Cluster> {
    let mut working = graph;
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut singleton_pool: Vec<u64> = Vec::new();

    let rejected_k_invalid = AtomicUsize::new(0);
    let rejected_non_modular = AtomicUsize::new(0);

    while working.num_nodes > 0 {
        let decomposition = core_decomposition(&working);
        let max_k = decomposition.max_core;

        if let Some(hook) = progress {
            hook(max_k);
        }

        if max_k < min_k {
            break;
        }

        let kcore_nodes = vertices_in_core(&decomposition, max_k);
        let subgraph = induced_subgraph(&working, &kcore_nodes);
        let components = connected_components(&subgraph);

        log::debug!(
            "peeling round: max_k={}, {} core vertices, {} components",
            max_k,
            kcore_nodes.len(),
            components.len()
        );

        // Per-component validity and emission, data-parallel across
        // components. Workers fill local buffers and merge each one once
        // under its own guard; the two rejection tallies are atomics.
        let emitted = Mutex::new(Vec::new());
        let removal = Mutex::new(HashSet::new());
        let pooled = Mutex::new(Vec::new());

        components.par_iter().for_each(|component| {
            let mut local_removal: Vec<u32> = Vec::with_capacity(component.len());
            for &sub_v in component {
                local_removal.push(kcore_nodes[sub_v as usize]);
            }

            if !metrics::is_k_valid(component, &subgraph, min_k) {
                rejected_k_invalid.fetch_add(1, Ordering::Relaxed);
                let orig_ids: Vec<u64> =
                    component.iter().map(|&v| subgraph.orig_of(v)).collect();
                pooled.lock().unwrap().extend(orig_ids);
                removal.lock().unwrap().extend(local_removal);
                return;
            }

            let orig_ids: Vec<u64> = component.iter().map(|&v| subgraph.orig_of(v)).collect();
            let q = modularity(&orig_ids, origin);

            // Dormant under the default constant-positive predicate
            if q <= 0.0 {
                rejected_non_modular.fetch_add(1, Ordering::Relaxed);
                pooled.lock().unwrap().extend(orig_ids);
                removal.lock().unwrap().extend(local_removal);
                return;
            }

            emitted.lock().unwrap().push(Cluster::new(orig_ids, max_k, q));
            removal.lock().unwrap().extend(local_removal);
        });

        clusters.append(&mut emitted.into_inner().unwrap());
        singleton_pool.append(&mut pooled.into_inner().unwrap());
        let removal = removal.into_inner().unwrap();

        working = remove_and_compact(&working, &removal);
    }

    // Residual vertices first, then the accumulated pool, as singletons
    for v in 0..working.num_nodes as u32 {
        let orig = working.orig_of(v);
        clusters.push(Cluster::new(vec![orig], 0, metrics::singleton_modularity(orig, origin)));
    }
    for orig in singleton_pool {
        clusters.push(Cluster::new(vec![orig], 0, metrics::singleton_modularity(orig, origin)));
    }

    let k_invalid = rejected_k_invalid.load(Ordering::Relaxed);
    let non_modular = rejected_non_modular.load(Ordering::Relaxed);
    if k_invalid > 0 || non_modular > 0 {
        log::debug!(
            "rejected components: {} not k-valid, {} not modular",
            k_invalid,
            non_modular
        );
    }

    clusters
}
