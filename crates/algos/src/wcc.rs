//! Label-propagation connected components (§4.7).
//!
//! Every vertex starts in its own component. A work list holds one record
//! per vertex, covering its full adjacency; each round attaches a vertex to
//! the smallest component label visible across one hop, then every vertex
//! climbs its own component chain to flatten it before the next round's
//! work list is rebuilt. Races during attach are harmless: at worst a useful
//! update gets overwritten and is simply repeated next round.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ahash::AHashMap;
use atomic::Atomic;
use graph_builder::Graph;
use graph_partition::index::Idx;
use graph_partition::intrinsics::remote_add;
use graph_partition::{parallel_for, ExecutionPolicy, WorkList};
use log::info;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct WccConfig {
    /// Edge sub-range claimed per work-list steal (§4.5's dynamic policy).
    #[cfg_attr(feature = "clap", clap(long, default_value_t = DEFAULT_WCC_GRAIN))]
    pub grain: usize,
}

pub const DEFAULT_WCC_GRAIN: usize = 64;

impl Default for WccConfig {
    fn default() -> Self {
        WccConfig { grain: DEFAULT_WCC_GRAIN }
    }
}

pub struct WccResult<NI: Idx> {
    component: Vec<NI>,
    component_size: Vec<usize>,
    pub num_components: usize,
    pub num_iterations: usize,
}

impl<NI: Idx> WccResult<NI> {
    pub fn component(&self, v: usize) -> NI {
        self.component[v]
    }

    pub fn component_size(&self, label: NI) -> usize {
        self.component_size[label.index()]
    }

    /// Serial per-component BFS (§8.5): confirms every edge connects two
    /// vertices the algorithm placed in the same component, and that every
    /// vertex was reached by some component's traversal.
    pub fn check<EV: Default + Copy + Send + Sync>(&self, graph: &Graph<NI, EV>) -> bool {
        let v = graph.num_vertices();
        let mut visited = vec![false; v];

        let mut label_to_source = AHashMap::new();
        for vid in 0..v {
            label_to_source.insert(self.component[vid].index(), vid);
        }

        for &source in label_to_source.values() {
            if visited[source] {
                continue;
            }
            let my_component = self.component[source].index();
            visited[source] = true;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(u) = queue.pop_front() {
                for n in graph.neighbors(u) {
                    let n = n.index();
                    if self.component[n].index() != my_component {
                        return false;
                    }
                    if !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }

        visited.iter().all(|&reached| reached)
    }
}

pub fn wcc<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    config: &WccConfig,
) -> WccResult<NI> {
    let v = graph.num_vertices();
    let nodelets = graph.nodelets();

    let component: Vec<Atomic<NI>> = (0..v).map(|i| Atomic::new(NI::new(i))).collect();
    let changed: Vec<AtomicBool> = (0..nodelets).map(|_| AtomicBool::new(false)).collect();

    let mut worklist = WorkList::new(v, nodelets);
    build_worklist(graph, &mut worklist);

    let start = Instant::now();
    let mut num_iterations = 1usize;
    loop {
        for c in &changed {
            c.store(false, Ordering::Relaxed);
        }

        worklist.process_all(config.grain, |src, i| {
            let dst = graph.neighbor_at(src, i);
            let comp_dst = component[dst.index()].load(Ordering::Relaxed);
            let prev_src = NI::fetch_min(&component[src], comp_dst, Ordering::AcqRel);
            if comp_dst < prev_src {
                changed[src % nodelets].store(true, Ordering::Relaxed);
            }
        });

        if !changed.iter().any(|c| c.load(Ordering::Relaxed)) {
            break;
        }

        // Path-compress: flatten every vertex straight to its root label.
        parallel_for(ExecutionPolicy::dynamic(64), v, |vid| loop {
            let c = component[vid].load(Ordering::Relaxed);
            let root = component[c.index()].load(Ordering::Relaxed);
            if c == root {
                break;
            }
            component[vid].store(root, Ordering::Relaxed);
        });

        build_worklist(graph, &mut worklist);
        num_iterations += 1;
    }
    info!("wcc converged after {} iterations in {:?}", num_iterations, start.elapsed());

    let component: Vec<NI> = component.into_iter().map(|c| c.into_inner()).collect();

    let component_size_cells: Vec<Atomic<usize>> = (0..v).map(|_| Atomic::new(0)).collect();
    parallel_for(ExecutionPolicy::dynamic(1024), v, |vid| {
        remote_add(&component_size_cells[component[vid].index()], 1usize);
    });
    let component_size: Vec<usize> =
        component_size_cells.into_iter().map(|c| c.into_inner()).collect();
    let num_components = component_size.iter().filter(|&&size| size > 0).count();

    WccResult { component, component_size, num_components, num_iterations }
}

fn build_worklist<NI: Idx, EV>(graph: &Graph<NI, EV>, worklist: &mut WorkList) {
    worklist.clear_all();
    parallel_for(ExecutionPolicy::dynamic(64), graph.num_vertices(), |v| {
        worklist.append(v, 0, graph.degree(v));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_builder::{DistEdgeList, GraphConfig};

    fn two_components() -> Graph<usize, ()> {
        let el = DistEdgeList::from_edges(vec![0usize, 2], vec![1usize, 3], 4);
        Graph::build(&el, &GraphConfig::default()).unwrap()
    }

    #[test]
    fn two_disjoint_edges_form_two_components() {
        let graph = two_components();
        let result = wcc(&graph, &WccConfig::default());

        assert_eq!(result.component(0), result.component(1));
        assert_eq!(result.component(2), result.component(3));
        assert_ne!(result.component(0), result.component(2));
        assert_eq!(result.num_components, 2);
        assert!(result.check(&graph));
    }

    #[test]
    fn s1_path_graph_is_one_component() {
        let el = DistEdgeList::from_edges(vec![0usize, 1, 2], vec![1usize, 2, 3], 4);
        let graph = Graph::<usize, ()>::build(&el, &GraphConfig::default()).unwrap();
        let result = wcc(&graph, &WccConfig::default());

        let c0 = result.component(0);
        assert!((0..4).all(|v| result.component(v) == c0));
        assert_eq!(result.num_components, 1);
        assert!(result.check(&graph));
    }

    #[test]
    fn isolated_vertex_is_its_own_component() {
        let el = DistEdgeList::from_edges(vec![0usize], vec![1usize], 3);
        let graph = Graph::<usize, ()>::build(&el, &GraphConfig::default()).unwrap();
        let result = wcc(&graph, &WccConfig::default());

        assert_eq!(result.component(0), result.component(1));
        assert_ne!(result.component(2), result.component(0));
        assert_eq!(result.num_components, 2);
        assert!(result.check(&graph));
    }
}
