//! PageRank (§4.8): a pull-style fixed-point iteration. Each vertex computes
//! an outgoing contribution, every vertex sums the contributions of its
//! neighbors, and scores are updated from that sum. The per-iteration L1
//! error is accumulated through a CAS-retry floating-point add, standing in
//! for the original's distributed remote-add over `double`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use atomic_float::AtomicF64;
use graph_builder::Graph;
use graph_partition::index::Idx;
use graph_partition::intrinsics::remote_add_f64;
use graph_partition::{parallel_for, ExecutionPolicy, SharedMut};
use log::info;

const CHUNK_SIZE: usize = 16384;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct PageRankConfig {
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 100))]
    pub max_iterations: usize,
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 1e-6))]
    pub epsilon: f64,
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 0.85))]
    pub damping: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        PageRankConfig { max_iterations: 100, epsilon: 1e-6, damping: 0.85 }
    }
}

pub struct PageRankResult {
    pub score: Vec<f64>,
    pub iterations: usize,
    pub error: f64,
}

pub fn page_rank<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    config: &PageRankConfig,
) -> PageRankResult {
    let v = graph.num_vertices();
    let init_score = 1.0 / v as f64;
    let base_score = (1.0 - config.damping) / v as f64;

    let mut score = vec![init_score; v];
    let mut contrib = vec![0.0f64; v];

    let score_ptr = SharedMut::new(score.as_mut_ptr());
    let contrib_ptr = SharedMut::new(contrib.as_mut_ptr());

    let mut iteration = 0usize;
    let mut error = f64::MAX;
    loop {
        let start_time = Instant::now();

        parallel_for(ExecutionPolicy::dynamic(1024), v, |u| {
            let degree = graph.degree(u);
            // Division by zero is defined as a zero contribution, since a
            // zero-degree vertex never passes anything on.
            let c = if degree > 0 {
                unsafe { score_ptr.add(u).read() / degree as f64 }
            } else {
                0.0
            };
            unsafe { contrib_ptr.add(u).write(c) };
        });

        error = page_rank_iteration(graph, base_score, config.damping, &contrib_ptr, &score_ptr);
        iteration += 1;

        info!(
            "pagerank iteration {} finished with error {:.8} in {:?}",
            iteration,
            error,
            start_time.elapsed()
        );

        if error < config.epsilon || iteration == config.max_iterations {
            break;
        }
    }

    PageRankResult { score, iterations: iteration, error }
}

fn page_rank_iteration<NI: Idx, EV>(
    graph: &Graph<NI, EV>,
    base_score: f64,
    damping: f64,
    contrib: &SharedMut<f64>,
    score: &SharedMut<f64>,
) -> f64 {
    let v = graph.num_vertices();
    let next_chunk = AtomicUsize::new(0);
    let total_error = AtomicF64::new(0.0);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads().max(1) {
            s.spawn(|_| {
                let mut error = 0.0f64;
                loop {
                    let start = next_chunk.fetch_add(CHUNK_SIZE, Ordering::AcqRel);
                    if start >= v {
                        break;
                    }
                    let end = (start + CHUNK_SIZE).min(v);

                    for u in start..end {
                        let incoming: f64 =
                            graph.neighbors(u).map(|d| unsafe { contrib.add(d.index()).read() }).sum();
                        let old_score = unsafe { score.add(u).read() };
                        let new_score = base_score + damping * incoming;
                        unsafe { score.add(u).write(new_score) };
                        error += (new_score - old_score).abs();
                    }
                }
                remote_add_f64(&total_error, error);
            });
        }
    });

    total_error.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_builder::{DistEdgeList, GraphConfig};

    #[test]
    fn s1_path_graph_scores_sum_to_one() {
        let el = DistEdgeList::from_edges(vec![0usize, 1, 2], vec![1usize, 2, 3], 4);
        let graph = Graph::<usize, ()>::build(&el, &GraphConfig::default()).unwrap();

        let result = page_rank(&graph, &PageRankConfig::default());

        let total: f64 = result.score.iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "scores should sum to ~1, got {total}");
        assert!(result.error < PageRankConfig::default().epsilon);
    }

    #[test]
    fn s4_star_hub_has_highest_score() {
        let el = DistEdgeList::from_edges(vec![0usize, 0, 0, 0], vec![1usize, 2, 3, 4], 5);
        let graph = Graph::<usize, ()>::build(&el, &GraphConfig::default()).unwrap();

        let result = page_rank(&graph, &PageRankConfig::default());

        for leaf in 1..5 {
            assert!(result.score[0] > result.score[leaf]);
        }
    }

    #[test]
    fn zero_degree_vertex_gets_only_base_score() {
        let el = DistEdgeList::from_edges(vec![0usize], vec![1usize], 3);
        let graph = Graph::<usize, ()>::build(&el, &GraphConfig::default()).unwrap();
        let config = PageRankConfig::default();

        let result = page_rank(&graph, &config);

        let base_score = (1.0 - config.damping) / graph.num_vertices() as f64;
        assert!((result.score[2] - base_score).abs() < 1e-9);
    }
}
