//! Ordered-intersection triangle count and k-truss kernel binary (§4.9, §6).
//!
//! Always reports the plain triangle count; additionally runs the k-truss
//! peeling loop (bounded by `--k_limit` when given) since both kernels share
//! the same sorted-adjacency precondition and per-arc bookkeeping.

use clap::Parser;
use graph_algos::triangle_count::{k_truss, triangle_count, KTrussConfig, TriangleCountConfig};
use graph_app::{active_region, run_main, time_trials, CommonArgs, Error};
use log::info;

#[derive(Debug, Parser)]
#[command(about = "Ordered-neighbor-intersection triangle count and k-truss")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    triangle_count: TriangleCountConfig,

    #[command(flatten)]
    k_truss: KTrussConfig,

    /// Skip the k-truss peeling loop and only report the triangle count.
    #[arg(long, default_value_t = false)]
    skip_k_truss: bool,

    /// Compare against a serial reference triangle count (§8.7).
    #[arg(long, default_value_t = false)]
    check_results: bool,
}

fn main() {
    run_main(|| {
        let args = Args::parse();
        // Triangle count and k-truss both require ascending adjacency.
        let graph = args.common.load_graph(true)?;

        let region = active_region("triangle_count");
        let tc_results = time_trials(&region, args.common.num_trials, |_| {
            triangle_count(&graph, &args.triangle_count)
        });

        for result in &tc_results {
            info!(
                "triangle count: {} triangles, {} two-paths",
                result.num_triangles, result.num_twopaths
            );
        }

        if args.check_results {
            let reference = serial_triangle_count(&graph);
            let matches = tc_results.iter().all(|r| r.num_triangles == reference);
            if !matches {
                return Err(Error::VerificationFailed);
            }
        }

        if !args.skip_k_truss {
            let k_region = active_region("k_truss");
            let k_results = time_trials(&k_region, args.common.num_trials, |_| {
                k_truss(&graph, &args.k_truss)
            });
            for result in k_results {
                let result = result?;
                info!("k-truss: max_k={}", result.max_k);
                for k in 2..=result.max_k {
                    info!("  {}-truss: {} edges, {} vertices", k, result.edges_at(k), result.vertices_at(k));
                }
            }
        }

        if args.check_results {
            println!("PASS");
        }
        Ok(())
    });
}

/// Serial reference triangle count (§8.7): the same ordered-intersection
/// idea as `graph_algos::triangle_count`, walked single-threaded.
fn serial_triangle_count(graph: &graph_builder::Graph<usize, ()>) -> u64 {
    let mut count = 0u64;
    for u in 0..graph.num_vertices() {
        let adj_u = graph.sorted_adjacency(u);
        let lt_u = adj_u.partition_point(|&x| x < u);
        for &v in &adj_u[0..lt_u] {
            let adj_v = graph.sorted_adjacency(v);
            let lt_v = adj_v.partition_point(|&x| x < v);
            let mut p = 0usize;
            for &w in &adj_v[0..lt_v] {
                while p < lt_u && adj_u[p] < w {
                    p += 1;
                }
                if p < lt_u && adj_u[p] == w {
                    count += 1;
                }
            }
        }
    }
    count
}
