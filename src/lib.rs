//! Iterative k-core clustering (IKC) for large undirected graphs, with an
//! incremental extension for streaming edge and node additions.

pub mod config;
pub mod data;
pub mod graph;
pub mod cluster;
pub mod streaming;
pub mod storage;

pub use anyhow::{Result, anyhow};
