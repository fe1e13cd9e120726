//! Direction-optimizing breadth-first search (§4.6): a queue-driven
//! top-down phase that migrates to each discovered neighbor's parent slot,
//! and a bitmap-driven bottom-up phase that scans unvisited vertices for an
//! already-visited neighbor. A Beamer-style controller switches between them
//! based on the ratio of frontier out-degree to remaining unexplored edges.

use std::sync::atomic::{AtomicI64, Ordering};

use graph_builder::Graph;
use graph_partition::ack::disable_acks;
use graph_partition::index::Idx;
use graph_partition::{parallel_for, Bitmap, ExecutionPolicy, SlidingQueue};
use log::info;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "clap", clap(rename_all = "snake_case"))]
pub enum BfsAlgorithm {
    /// Top-down only, CAS-ing `parent[d]` from the discovering thread
    /// before migrating on to the next neighbor.
    MigratingThreads,
    /// Top-down only, via a fire-and-forget `new_parent[]` write per edge
    /// followed by a bulk sweep once the ack fence clears.
    RemoteWrites,
    /// Beamer direction-switching controller with a remote-writes top-down
    /// step.
    RemoteWritesHybrid,
    /// Beamer direction-switching controller with a migrating-threads
    /// top-down step (the algorithm the original calls at its one live call
    /// site, `run_beamer(source, 15, 18)`).
    BeamerHybrid,
    /// Skip BFS entirely.
    None,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct BfsConfig {
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value = "beamer_hybrid"))]
    pub algorithm: BfsAlgorithm,
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 15))]
    pub alpha: i64,
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 18))]
    pub beta: i64,
    #[cfg_attr(feature = "clap", clap(long, default_value_t = usize::MAX))]
    pub max_level: usize,
}

impl Default for BfsConfig {
    fn default() -> Self {
        BfsConfig { algorithm: BfsAlgorithm::BeamerHybrid, alpha: 15, beta: 18, max_level: usize::MAX }
    }
}

pub struct BfsResult {
    pub parent: Vec<i64>,
    pub levels: usize,
}

impl BfsResult {
    /// Climbs parent pointers to find `v`'s BFS depth; `None` if `v` was
    /// never reached.
    pub fn depth(&self, v: usize) -> Option<usize> {
        if self.parent[v] < 0 {
            return None;
        }
        let mut cur = v;
        let mut d = 0;
        while self.parent[cur] as usize != cur {
            cur = self.parent[cur] as usize;
            d += 1;
            if d > self.parent.len() {
                return None;
            }
        }
        Some(d)
    }

    /// Verifies the two invariants from §8.4: the source is its own parent,
    /// and every reached vertex's parent is one of its neighbors.
    pub fn check<NI: Idx>(&self, graph: &Graph<NI, ()>, source: usize) -> bool {
        if self.parent[source] as usize != source {
            return false;
        }
        (0..graph.num_vertices()).all(|v| {
            let p = self.parent[v];
            if v == source {
                return p as usize == source;
            }
            if p < 0 {
                true
            } else {
                graph.neighbors(v).any(|n| n.index() == p as usize)
            }
        })
    }
}

pub fn bfs<NI: Idx>(
    graph: &Graph<NI, ()>,
    source: usize,
    config: &BfsConfig,
) -> Result<BfsResult, Error> {
    let v = graph.num_vertices();
    if source >= v {
        return Err(Error::OutOfRange { id: source, num_vertices: v });
    }

    let parent: Vec<AtomicI64> = (0..v)
        .map(|vid| {
            let d = graph.degree(vid);
            AtomicI64::new(if d > 0 { -(d as i64) } else { -1 })
        })
        .collect();
    parent[source].store(source as i64, Ordering::Relaxed);

    let levels = match config.algorithm {
        BfsAlgorithm::None => 0,
        BfsAlgorithm::MigratingThreads => run_pure_top_down(graph, &parent, source, config, true),
        BfsAlgorithm::RemoteWrites => run_pure_top_down(graph, &parent, source, config, false),
        BfsAlgorithm::RemoteWritesHybrid => run_beamer(graph, &parent, source, config, false),
        BfsAlgorithm::BeamerHybrid => run_beamer(graph, &parent, source, config, true),
    };

    let parent: Vec<i64> = parent.into_iter().map(|a| a.into_inner()).collect();
    info!("bfs from {} finished after {} levels", source, levels);
    Ok(BfsResult { parent, levels })
}

fn run_pure_top_down<NI: Idx>(
    graph: &Graph<NI, ()>,
    parent: &[AtomicI64],
    source: usize,
    config: &BfsConfig,
    migrating: bool,
) -> usize {
    let nodelets = graph.nodelets();
    let v = graph.num_vertices();
    let mut queue = SlidingQueue::new(v, nodelets);
    queue.push_back(source % nodelets, source as i64);
    queue.slide_all_windows();

    let mut new_parent: Vec<AtomicI64> = if migrating {
        Vec::new()
    } else {
        (0..v).map(|_| AtomicI64::new(-1)).collect()
    };

    let mut levels = 0;
    while !queue.all_empty() && levels < config.max_level {
        if migrating {
            top_down_step_migrating(graph, parent, &queue, nodelets);
        } else {
            reset_new_parent(&new_parent);
            top_down_step_remote_writes(graph, &new_parent, &queue);
            populate_next_frontier(v, parent, &new_parent, &queue, nodelets);
        }
        queue.slide_all_windows();
        levels += 1;
    }
    levels
}

fn run_beamer<NI: Idx>(
    graph: &Graph<NI, ()>,
    parent: &[AtomicI64],
    source: usize,
    config: &BfsConfig,
    migrating: bool,
) -> usize {
    let nodelets = graph.nodelets();
    let v = graph.num_vertices();
    let e = graph.num_edges();

    let mut queue = SlidingQueue::new(v, nodelets);
    queue.push_back(source % nodelets, source as i64);
    queue.slide_all_windows();

    let mut new_parent: Vec<AtomicI64> = if migrating {
        Vec::new()
    } else {
        (0..v).map(|_| AtomicI64::new(-1)).collect()
    };

    let mut frontier = Bitmap::new(v, nodelets);
    let mut next_frontier = Bitmap::new(v, nodelets);

    #[derive(PartialEq)]
    enum Phase {
        TopDown,
        BottomUp,
    }
    let mut phase = Phase::TopDown;

    let mut scout_count: i64 = graph.degree(source) as i64;
    let mut edges_to_check: i64 = 2 * e as i64 - scout_count;
    let mut prev_awake: i64 = i64::MAX;
    let mut levels = 0usize;

    loop {
        if levels >= config.max_level {
            break;
        }
        match phase {
            Phase::TopDown => {
                if queue.all_empty() {
                    break;
                }
                scout_count = if migrating {
                    top_down_step_migrating(graph, parent, &queue, nodelets)
                } else {
                    reset_new_parent(&new_parent);
                    top_down_step_remote_writes(graph, &new_parent, &queue);
                    populate_next_frontier(v, parent, &new_parent, &queue, nodelets)
                };
                edges_to_check -= scout_count;
                levels += 1;
                queue.slide_all_windows();

                if edges_to_check > 0 && scout_count > edges_to_check / config.alpha.max(1) {
                    frontier = queue.to_bitmap(v);
                    next_frontier.clear();
                    queue.reset_all();
                    prev_awake = i64::MAX;
                    phase = Phase::BottomUp;
                }
            }
            Phase::BottomUp => {
                if !frontier.any_set() {
                    break;
                }
                let awake = bottom_up_step(graph, parent, &frontier, &next_frontier);
                levels += 1;
                std::mem::swap(&mut frontier, &mut next_frontier);
                next_frontier.clear();

                if awake < prev_awake && awake <= (v as i64) / config.beta.max(1) {
                    queue.reset_all();
                    frontier.par_for_each_set(|vid| queue.push_back(vid % nodelets, vid as i64));
                    queue.slide_all_windows();
                    scout_count = 1;
                    phase = Phase::TopDown;
                }
                prev_awake = awake;
                if awake == 0 && phase == Phase::BottomUp {
                    break;
                }
            }
        }
    }

    levels
}

fn reset_new_parent(new_parent: &[AtomicI64]) {
    parallel_for(ExecutionPolicy::dynamic(4096), new_parent.len(), |i| {
        new_parent[i].store(-1, Ordering::Relaxed);
    });
}

fn top_down_step_migrating<NI: Idx>(
    graph: &Graph<NI, ()>,
    parent: &[AtomicI64],
    queue: &SlidingQueue,
    nodelets: usize,
) -> i64 {
    let scout_count = AtomicI64::new(0);
    queue.forall_items(|v| {
        let vid = v as usize;
        for d in graph.neighbors(vid) {
            let d = d.index();
            let prev = parent[d].load(Ordering::Acquire);
            if prev < 0
                && parent[d]
                    .compare_exchange(prev, vid as i64, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                queue.push_back(d % nodelets, d as i64);
                scout_count.fetch_add(-prev, Ordering::AcqRel);
            }
        }
    });
    scout_count.load(Ordering::Acquire)
}

/// Ack-controller disabled region confined strictly to the `new_parent[]`
/// writes, per the design note in §9: any read of the array belongs outside
/// this bracket.
fn top_down_step_remote_writes<NI: Idx>(graph: &Graph<NI, ()>, new_parent: &[AtomicI64], queue: &SlidingQueue) {
    let _region = disable_acks();
    queue.forall_items(|v| {
        let vid = v as usize;
        for d in graph.neighbors(vid) {
            new_parent[d.index()].store(vid as i64, Ordering::Relaxed);
        }
    });
}

fn populate_next_frontier(
    v: usize,
    parent: &[AtomicI64],
    new_parent: &[AtomicI64],
    queue: &SlidingQueue,
    nodelets: usize,
) -> i64 {
    let scout_count = AtomicI64::new(0);
    parallel_for(ExecutionPolicy::dynamic(1024), v, |vid| {
        let p = parent[vid].load(Ordering::Acquire);
        let np = new_parent[vid].load(Ordering::Acquire);
        if p < 0 && np >= 0 {
            parent[vid].store(np, Ordering::Release);
            scout_count.fetch_add(-p, Ordering::AcqRel);
            queue.push_back(vid % nodelets, vid as i64);
        }
    });
    scout_count.load(Ordering::Acquire)
}

fn bottom_up_step<NI: Idx>(
    graph: &Graph<NI, ()>,
    parent: &[AtomicI64],
    frontier: &Bitmap,
    next_frontier: &Bitmap,
) -> i64 {
    let awake = AtomicI64::new(0);
    parallel_for(ExecutionPolicy::dynamic(256), graph.num_vertices(), |vid| {
        if parent[vid].load(Ordering::Acquire) >= 0 {
            return;
        }
        for p in graph.neighbors(vid) {
            if frontier.test(p.index()) {
                parent[vid].store(p.index() as i64, Ordering::Release);
                next_frontier.set_bit(vid);
                awake.fetch_add(1, Ordering::AcqRel);
                break;
            }
        }
    });
    awake.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_builder::{DistEdgeList, GraphConfig};

    fn path_graph() -> Graph<usize, ()> {
        let el = DistEdgeList::from_edges(vec![0usize, 1, 2], vec![1usize, 2, 3], 4);
        Graph::build(&el, &GraphConfig::default()).unwrap()
    }

    fn star_graph() -> Graph<usize, ()> {
        let el = DistEdgeList::from_edges(vec![0usize, 0, 0, 0], vec![1usize, 2, 3, 4], 5);
        Graph::build(&el, &GraphConfig::default()).unwrap()
    }

    #[test]
    fn s1_path_bfs_from_zero() {
        let graph = path_graph();
        for algorithm in [
            BfsAlgorithm::MigratingThreads,
            BfsAlgorithm::RemoteWrites,
            BfsAlgorithm::RemoteWritesHybrid,
            BfsAlgorithm::BeamerHybrid,
        ] {
            let config = BfsConfig { algorithm, ..BfsConfig::default() };
            let result = bfs(&graph, 0, &config).unwrap();
            assert_eq!(result.parent, vec![0, 0, 1, 2]);
            assert_eq!(result.depth(3), Some(3));
            assert!(result.check(&graph, 0));
        }
    }

    #[test]
    fn s4_star_bfs_all_leaves_at_depth_one() {
        let graph = star_graph();
        let result = bfs(&graph, 0, &BfsConfig::default()).unwrap();
        for leaf in 1..5 {
            assert_eq!(result.parent[leaf], 0);
            assert_eq!(result.depth(leaf), Some(1));
        }
    }

    #[test]
    fn source_with_zero_degree_visits_only_itself() {
        let el = DistEdgeList::from_edges(vec![0usize], vec![1usize], 3);
        let graph = Graph::build(&el, &GraphConfig::default()).unwrap();
        let result = bfs(&graph, 2, &BfsConfig::default()).unwrap();
        assert_eq!(result.parent[2], 2);
        assert!(result.parent[0] < 0);
        assert!(result.parent[1] < 0);
    }

    #[test]
    fn out_of_range_source_is_an_error() {
        let graph = path_graph();
        let err = bfs(&graph, 99, &BfsConfig::default()).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }
}
