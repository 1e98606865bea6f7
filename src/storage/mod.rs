//! Cluster output and run summaries

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use serde_json::json;

use crate::cluster::Cluster;
use crate::graph::CsrGraph;

/// Output record layout for cluster memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `node_id,cluster_id,k_value,modularity`, one line per membership
    Csv,
    /// `node_id<TAB>cluster_id`, one line per membership
    Tsv,
}

/// Write one line per (node, cluster) membership. Cluster ids are 1-based
/// in emission order. No header in either format.
pub fn write_clusters(path: &str, clusters: &[Cluster], format: OutputFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("could not create output file: {}", path))?;
    let mut out = BufWriter::new(file);

    for (index, cluster) in clusters.iter().enumerate() {
        let cluster_id = index + 1;
        for &node in &cluster.nodes {
            match format {
                OutputFormat::Csv => writeln!(
                    out,
                    "{},{},{},{}",
                    node, cluster_id, cluster.k_value, cluster.modularity
                )?,
                OutputFormat::Tsv => writeln!(out, "{}\t{}", node, cluster_id)?,
            }
        }
    }

    out.flush()?;
    log::info!("Results written to: {}", path);

    Ok(())
}

/// Write a JSON summary of the run: graph shape plus cluster statistics.
pub fn write_summary(path: &str, graph: &CsrGraph, clusters: &[Cluster]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("could not create summary file: {}", path))?;
    let mut out = BufWriter::new(file);

    let sizes: Vec<usize> = clusters.iter().map(|c| c.len()).collect();
    let singleton_count = clusters.iter().filter(|c| c.len() == 1).count();

    // histogram of emitted k values
    let mut k_histogram = std::collections::BTreeMap::new();
    for cluster in clusters {
        *k_histogram.entry(cluster.k_value.to_string()).or_insert(0u64) += 1;
    }

    let summary = json!({
        "graph": {
            "node_count": graph.num_nodes,
            "edge_count": graph.num_edges,
        },
        "clusters": {
            "count": clusters.len(),
            "singletons": singleton_count,
            "largest": sizes.iter().max().copied().unwrap_or(0),
            "covered_nodes": sizes.iter().sum::<usize>(),
            "k_histogram": k_histogram,
        }
    });

    out.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;
    out.flush()?;
    log::info!("Summary written to: {}", path);

    Ok(())
}
