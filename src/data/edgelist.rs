//! TSV edge-list ingestion

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;

use crate::graph::{CsrGraph, GraphBuilder};

/// Lines handed to one parser task
const PARSE_CHUNK: usize = 64 * 1024;

/// Load an undirected graph from a tab-separated edge list: one edge per
/// line, two unsigned integer ids, no header. Self-loops are dropped and
/// duplicate pairs (in either order) are deduplicated. Malformed lines are
/// a hard error carrying the line number.
pub fn load_edge_list(path: &str) -> Result<CsrGraph> {
    log::info!("Reading edge list: {}", path);

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read edge list: {}", path))?;
    let lines: Vec<&str> = contents.lines().collect();

    // Parse in parallel chunks, then build the graph serially so internal
    // ids follow file order
    let chunks: Vec<Vec<(u64, u64)>> = lines
        .par_chunks(PARSE_CHUNK)
        .enumerate()
        .map(|(chunk_index, chunk)| parse_chunk(chunk, chunk_index * PARSE_CHUNK))
        .collect::<Result<_>>()?;

    let mut total_lines = 0usize;
    let mut builder = GraphBuilder::new();
    for chunk in &chunks {
        for &(u, v) in chunk {
            builder.add_edge(u, v);
            total_lines += 1;
        }
    }

    let graph = builder.build();

    log::info!(
        "Loaded {} nodes and {} edges from {} edge lines ({} dropped as self-loops or duplicates)",
        graph.num_nodes,
        graph.num_edges,
        total_lines,
        total_lines - graph.num_edges
    );

    Ok(graph)
}

fn parse_chunk(chunk: &[&str], base_line: usize) -> Result<Vec<(u64, u64)>> {
    let mut edges = Vec::with_capacity(chunk.len());

    for (offset, raw) in chunk.iter().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let edge = parse_line(line)
            .ok_or_else(|| anyhow!("malformed edge at line {}: {:?}", base_line + offset + 1, line))?;
        edges.push(edge);
    }

    Ok(edges)
}

fn parse_line(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split('\t');
    let u = fields.next()?.trim().parse().ok()?;
    let v = fields.next()?.trim().parse().ok()?;
    Some((u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tsv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_deduplicates() {
        let file = write_tsv("1\t2\n2\t3\n3\t1\n2\t1\n4\t4\n");
        let g = load_edge_list(file.path().to_str().unwrap()).unwrap();

        // self-loop 4-4 still registers vertex 4, the edge is dropped
        assert_eq!(g.num_nodes, 4);
        assert_eq!(g.num_edges, 3);
        assert!(g.has_edge(0, 1));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let file = write_tsv("1\t2\n\n2\t3\n");
        let g = load_edge_list(file.path().to_str().unwrap()).unwrap();
        assert_eq!(g.num_edges, 2);
    }

    #[test]
    fn malformed_line_is_an_error_with_position() {
        let file = write_tsv("1\t2\nnot-a-number\t3\n");
        let err = load_edge_list(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn missing_second_field_is_an_error() {
        let file = write_tsv("1\n");
        assert!(load_edge_list(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_edge_list("/no/such/file.tsv").is_err());
    }
}
