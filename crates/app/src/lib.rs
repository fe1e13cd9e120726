//! Shared CLI scaffolding for the per-kernel binaries in `crates/app/src/bin`.
//!
//! Each kernel executable (`bfs`, `wcc`, `pagerank`, `triangle_count`) flattens
//! [`CommonArgs`] alongside its own algorithm config (`graph_algos::bfs::BfsConfig`
//! and friends, all of which already derive `clap::Args` behind the `clap`
//! feature), loads a graph through [`load_graph`], runs the kernel
//! `num_trials` times through [`time_trials`], and exits nonzero via
//! [`Error`] on any failure (§7).

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use graph_builder::{DistEdgeList, Graph, GraphConfig};
use log::info;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Builder(#[from] graph_builder::Error),

    #[error(transparent)]
    Algos(#[from] graph_algos::Error),

    #[error("graph construction check failed for {path}")]
    GraphCheckFailed { path: PathBuf },

    #[error("result verification failed")]
    VerificationFailed,
}

/// Options shared by every kernel binary (§6 CLI surface).
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Path to an `el64` binary edge list, or (with `--distributed_load`)
    /// the shared basename of a per-nodelet fileset.
    #[arg(long)]
    pub graph_filename: PathBuf,

    /// Load via `DistEdgeList::load_distributed` instead of the default
    /// single-reader `load_binary`.
    #[arg(long, default_value_t = false)]
    pub distributed_load: bool,

    /// Number of times to repeat the kernel on the same constructed graph.
    #[arg(long, default_value_t = 1)]
    pub num_trials: usize,

    /// Simulated nodelet count driving block layout and traversal policy
    /// fan-out; defaults to the physical core count.
    #[arg(long, default_value_t = num_cpus::get_physical())]
    pub nodelets: usize,

    /// Sort each vertex's adjacency ascending (required by triangle count
    /// and k-truss; optional elsewhere).
    #[arg(long, default_value_t = false)]
    pub sort_edge_blocks: bool,

    /// Print the loaded edge list to stdout before constructing the graph.
    #[arg(long, default_value_t = false)]
    pub dump_edge_list: bool,

    /// Run the slow post-construction adjacency/dedup check (§4.4).
    #[arg(long, default_value_t = false)]
    pub check_graph: bool,

    /// Print the constructed adjacency to stdout.
    #[arg(long, default_value_t = false)]
    pub dump_graph: bool,
}

impl CommonArgs {
    /// Builds a `Graph<usize, ()>` from this run's input, honoring
    /// `--distributed_load`, `--sort_edge_blocks`, `--check_graph` and
    /// `--dump_*` (§4.3/§4.4). `force_sort` lets a kernel that requires
    /// sorted adjacency (triangle count, k-truss) override the flag.
    pub fn load_graph(&self, force_sort: bool) -> Result<Graph<usize, ()>, Error> {
        let edge_list = if self.distributed_load {
            DistEdgeList::<usize>::load_distributed(&self.graph_filename, self.nodelets)?
        } else {
            DistEdgeList::<usize>::load_binary(&self.graph_filename)?
        };

        if self.dump_edge_list {
            for (u, v) in edge_list.src().iter().zip(edge_list.dst().iter()) {
                println!("{u} {v}");
            }
        }

        let config = GraphConfig {
            nodelets: self.nodelets,
            sort_adjacency: self.sort_edge_blocks || force_sort,
            ..GraphConfig::default()
        };
        let graph = Graph::build(&edge_list, &config)?;

        if self.check_graph && !graph.check(&edge_list) {
            return Err(Error::GraphCheckFailed { path: self.graph_filename.clone() });
        }

        if self.dump_graph {
            for v in 0..graph.num_vertices() {
                let neighbors: Vec<String> = graph.neighbors(v).map(|n| n.to_string()).collect();
                println!("{v}: {}", neighbors.join(" "));
            }
        }

        Ok(graph)
    }
}

/// The label used by the external timing harness to bucket this run's
/// region, honoring `HOOKS_ACTIVE_REGION` (§6 Environment) and falling back
/// to `default_name` (the kernel name) when it is unset.
pub fn active_region(default_name: &str) -> String {
    std::env::var("HOOKS_ACTIVE_REGION").unwrap_or_else(|_| default_name.to_owned())
}

/// Runs `trial` once per `[0, num_trials)`, logging each iteration's elapsed
/// time under `region` the way the external benchmarking harness's region
/// timers would (§1/§6 — the harness itself is an external collaborator;
/// this is only the ambient logging every kernel binary carries).
pub fn time_trials<T>(region: &str, num_trials: usize, mut trial: impl FnMut(usize) -> T) -> Vec<T> {
    let mut results = Vec::with_capacity(num_trials.max(1));
    for run in 0..num_trials.max(1) {
        let start = Instant::now();
        let result = trial(run);
        info!("[{region}] trial {} of {} finished in {:?}", run + 1, num_trials.max(1), start.elapsed());
        results.push(result);
    }
    results
}

/// Shared entry-point boilerplate: installs `env_logger` and, on error,
/// prints the message and exits nonzero rather than unwinding with a panic
/// (§7 — no partial results are reported on failure).
pub fn run_main(body: impl FnOnce() -> Result<(), Error>) {
    env_logger::init();
    if let Err(err) = body() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
