use anyhow::{Result, bail};
use clap::Parser;

mod config;
mod data;
mod graph;
mod cluster;
mod streaming;
mod storage;

use config::Config;
use cluster::detection::iterative_kcore_clustering;
use cluster::metrics::simplified_modularity;
use storage::OutputFormat;

#[derive(Parser, Debug)]
#[clap(
    name = "ikc",
    about = "Iterative k-core clustering of large undirected graphs"
)]
struct Cli {
    /// Path to input graph edge list (TSV format)
    #[clap(short = 'e', value_name = "PATH")]
    edge_list: Option<String>,

    /// Path to output file
    #[clap(short = 'o', value_name = "PATH")]
    output: Option<String>,

    /// Minimum k value for valid clusters
    #[clap(short = 'k', default_value = "0")]
    min_k: u32,

    /// Number of threads (0 = hardware concurrency)
    #[clap(short = 't', default_value = "0")]
    threads: usize,

    /// Quiet mode (suppress progress output)
    #[clap(short = 'q')]
    quiet: bool,

    /// Output as TSV (node_id<TAB>cluster_id) instead of CSV
    #[clap(long)]
    tsv: bool,

    /// Also write a JSON run summary to this path
    #[clap(long, value_name = "PATH")]
    summary: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Both paths are required; report them the traditional way with exit
    // code 1 rather than clap's usage error
    let (edge_list, output) = match (&args.edge_list, &args.output) {
        (Some(e), Some(o)) => (e.clone(), o.clone()),
        _ => {
            eprintln!("Error: both -e (input file) and -o (output file) are required.");
            eprintln!("Usage: ikc -e <graph.tsv> -o <output.csv> [-k <min_k>] [-t <threads>] [-q] [--tsv]");
            std::process::exit(1);
        }
    };

    let config = Config {
        min_k: args.min_k,
        threads: args.threads,
        output_format: if args.tsv { OutputFormat::Tsv } else { OutputFormat::Csv },
        quiet: args.quiet,
    };

    let log_level = if config.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let num_threads = if config.threads > 0 {
        config.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    // 1. Load the graph
    let graph = data::edgelist::load_edge_list(&edge_list)?;

    if graph.num_nodes == 0 {
        bail!("failed to load graph or graph is empty: {}", edge_list);
    }

    log::info!(
        "Graph loaded: {} nodes, {} edges, ~{} MB",
        graph.num_nodes,
        graph.num_edges,
        graph.memory_usage() / (1024 * 1024)
    );

    // 2. Cluster
    log::info!("Running IKC with min_k={}", config.min_k);
    let progress = |max_k: u32| log::info!("peeling: current max k-core = {}", max_k);
    let clusters = iterative_kcore_clustering(
        graph.clone(),
        config.min_k,
        &graph,
        &simplified_modularity,
        Some(&progress),
    );

    log::info!("Total clusters found: {}", clusters.len());

    // 3. Write results
    storage::write_clusters(&output, &clusters, config.output_format)?;

    if let Some(summary_path) = &args.summary {
        storage::write_summary(summary_path, &graph, &clusters)?;
    }

    Ok(())
}
