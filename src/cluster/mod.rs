//! Cluster model and the iterative k-core clustering algorithm

pub mod detection;
pub mod metrics;

use serde::{Serialize, Deserialize};

/// A cluster emitted by the peeling loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Member vertices as original ids
    pub nodes: Vec<u64>,

    /// The k of the core this cluster was extracted from (0 for singletons)
    pub k_value: u32,

    /// Modularity score under the predicate in effect when it was emitted
    pub modularity: f64,
}

impl Cluster {
    pub fn new(nodes: Vec<u64>, k_value: u32, modularity: f64) -> Self {
        Self {
            nodes,
            k_value,
            modularity,
        }
    }

    /// Number of member vertices
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
