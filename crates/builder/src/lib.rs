//! Distributed edge lists and multi-block graph construction.
//!
//! This crate turns a stream of undirected edges into the adjacency
//! structure every kernel in `graph_algos` reads: a vertex-partitioned,
//! multi-block edge storage built by a three-pass scan over a
//! [`DistEdgeList`] (degree count, block sizing, carve-and-fill).

pub mod edge_list;
pub mod error;
pub mod graph;

pub use edge_list::DistEdgeList;
pub use error::Error;
pub use graph::{EdgeBlock, Graph, GraphConfig, DEFAULT_BLOCK_GRAIN};

pub mod prelude {
    pub use crate::edge_list::DistEdgeList;
    pub use crate::error::Error;
    pub use crate::graph::{EdgeBlock, Graph, GraphConfig};
}
