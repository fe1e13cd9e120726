//! Direction-optimizing BFS kernel binary (§4.6, §6).

use clap::Parser;
use graph_algos::bfs::{bfs, BfsConfig};
use graph_app::{active_region, run_main, time_trials, CommonArgs, Error};
use log::info;

#[derive(Debug, Parser)]
#[command(about = "Direction-optimizing breadth-first search over a distributed graph")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    bfs: BfsConfig,

    /// Vertex to start the search from (§4.6; validated against `V` at
    /// kernel start, fatal if out of range).
    #[arg(long, default_value_t = 0)]
    source_vertex: usize,

    /// Verify the parent-array invariants from §8.4 after the run.
    #[arg(long, default_value_t = false)]
    check_results: bool,
}

fn main() {
    run_main(|| {
        let args = Args::parse();
        let graph = args.common.load_graph(false)?;

        let region = active_region("bfs");
        let results = time_trials(&region, args.common.num_trials, |_| {
            bfs(&graph, args.source_vertex, &args.bfs)
        });

        let mut all_passed = true;
        for result in results {
            let result = result?;
            let reached = result.parent.iter().filter(|&&p| p >= 0).count();
            info!("bfs reached {} of {} vertices in {} levels", reached, graph.num_vertices(), result.levels);

            if args.check_results && !result.check(&graph, args.source_vertex) {
                all_passed = false;
            }
        }

        if args.check_results {
            if all_passed {
                println!("PASS");
            } else {
                return Err(Error::VerificationFailed);
            }
        }
        Ok(())
    });
}
