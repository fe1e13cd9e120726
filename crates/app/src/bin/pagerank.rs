//! Pull-style PageRank kernel binary (§4.8, §6).

use clap::Parser;
use graph_algos::pagerank::{page_rank, PageRankConfig};
use graph_app::{active_region, run_main, time_trials, CommonArgs};
use log::info;

#[derive(Debug, Parser)]
#[command(about = "Pull-style PageRank with L1-error convergence")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    page_rank: PageRankConfig,
}

fn main() {
    run_main(|| {
        let args = Args::parse();
        let graph = args.common.load_graph(false)?;

        let region = active_region("pagerank");
        let results = time_trials(&region, args.common.num_trials, |_| page_rank(&graph, &args.page_rank));

        for result in &results {
            let total: f64 = result.score.iter().sum();
            info!(
                "pagerank converged after {} iterations, error={:.8}, score sum={:.6}",
                result.iterations, result.error, total
            );
        }
        Ok(())
    });
}
