//! Graph representation and algorithms module

pub mod compressed;
pub mod builder;
pub mod algorithms;
pub mod subgraph;

pub use compressed::CsrGraph;
pub use builder::GraphBuilder;
