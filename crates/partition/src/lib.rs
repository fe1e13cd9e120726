//! Partitioned-memory primitives for the graph analytics engine.
//!
//! This crate simulates the data-layout and concurrency contract of a
//! many-nodelet, physically-partitioned machine on ordinary shared-memory
//! hardware. "Nodelets" become a configurable partition count, "striping"
//! becomes an indexing convention (`i % nodelets`), and "remote asynchronous
//! writes" become ordinary atomics, with the ack-controller kept as a real
//! bracket/fence so callers retain the same ordering discipline.
//!
//! None of the types here know anything about graphs or algorithms; they are
//! the substrate [`graph_builder`] and the kernels in `graph_algos` are built
//! on top of.

pub mod ack;
pub mod bitmap;
pub mod execution;
pub mod index;
pub mod intrinsics;
pub mod replicated;
pub mod shared_mut;
pub mod sliding_queue;
pub mod striped;
pub mod worklist;

pub use ack::{acks_disabled, disable_acks, reenable_acks, AckRegion};
pub use bitmap::Bitmap;
pub use execution::{parallel_for, ExecutionPolicy};
pub use index::Idx;
pub use replicated::{Replicated, Shared};
pub use shared_mut::SharedMut;
pub use sliding_queue::SlidingQueue;
pub use striped::StripedArray;
pub use worklist::WorkList;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
}
