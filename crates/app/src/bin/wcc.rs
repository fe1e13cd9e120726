//! Label-propagation connected-components kernel binary (§4.7, §6).

use clap::Parser;
use graph_algos::wcc::{wcc, WccConfig};
use graph_app::{active_region, run_main, time_trials, CommonArgs, Error};
use log::info;

#[derive(Debug, Parser)]
#[command(about = "Shiloach-Vishkin label-propagation connected components")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    wcc: WccConfig,

    /// Verify the same-component-per-edge invariant from §8.5 after the run.
    #[arg(long, default_value_t = false)]
    check_results: bool,
}

fn main() {
    run_main(|| {
        let args = Args::parse();
        let graph = args.common.load_graph(false)?;

        let region = active_region("wcc");
        let results = time_trials(&region, args.common.num_trials, |_| wcc(&graph, &args.wcc));

        let mut all_passed = true;
        for result in &results {
            info!(
                "wcc found {} components after {} iterations",
                result.num_components, result.num_iterations
            );
            if args.check_results && !result.check(&graph) {
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
