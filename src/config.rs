//! Run configuration for the clustering pipeline

use crate::storage::OutputFormat;

/// Settings for one clustering run
pub struct Config {
    /// Minimum k for a cluster to be emitted
    pub min_k: u32,

    /// Worker threads (0 = all available cores)
    pub threads: usize,

    /// Membership record layout
    pub output_format: OutputFormat,

    /// Suppress progress output
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_k: 0,
            threads: 0,
            output_format: OutputFormat::Csv,
            quiet: false,
        }
    }
}
