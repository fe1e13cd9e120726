//! Graph construction: from a [`DistEdgeList`] to a replicated-shallow
//! adjacency structure with multiple edge blocks per vertex (§4.4).
//!
//! The edge list is scanned three times: once to count degrees, once to
//! count how many edges land in each of a vertex's blocks, and once to
//! actually place them. Between the second and third scan the per-block
//! counts are turned into a prefix sum over one flat edge arena, which plays
//! the role of the original's per-nodelet bulk arenas — physically one
//! allocation here, but partitioned into the same block ranges a
//! partitioned machine would carve out on each nodelet.

use std::sync::atomic::Ordering;

use atomic::Atomic;
use graph_partition::ack::disable_acks;
use graph_partition::index::Idx;
use graph_partition::intrinsics::remote_add;
use graph_partition::{parallel_for, ExecutionPolicy, SharedMut};
use log::info;

use crate::edge_list::DistEdgeList;
use crate::Error;

pub const DEFAULT_BLOCK_GRAIN: usize = 1024;

/// A contiguous slice of one vertex's adjacency, `edges[start..start+len]`.
/// Vertex `v` owns `vertex_num_edge_blocks(v)` of these, found via
/// `vertex_edge_blocks(v)`; block `b` is, on the original machine, homed at
/// nodelet `(home(v) + b) mod N`.
#[derive(Debug, Clone, Copy)]
pub struct EdgeBlock {
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Minimum number of edges per block before a vertex's adjacency is
    /// split into more than one block (§3 "Edge block").
    pub block_grain: usize,
    /// The simulated nodelet count; caps `#blocks(v)` and drives the
    /// edge-block walker's one-spawn-per-block fan-out.
    pub nodelets: usize,
    /// Sort each vertex's adjacency in ascending destination order.
    /// Ordered-intersection kernels (triangle count, k-truss) require this;
    /// when requested, block count collapses to exactly one per vertex,
    /// since sortedness and block-count are orthogonal and a single sorted
    /// run is what ordered intersection needs (see DESIGN.md).
    pub sort_adjacency: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            block_grain: DEFAULT_BLOCK_GRAIN,
            nodelets: num_cpus::get_physical().max(1),
            sort_adjacency: false,
        }
    }
}

/// A vertex-partitioned, multi-block adjacency structure built once from a
/// [`DistEdgeList`] and read by every kernel thereafter. Immutable after
/// construction (§5): kernels hold a non-owning reference and never mutate
/// it.
pub struct Graph<NI: Idx = usize, EV = ()> {
    num_vertices: usize,
    num_edges: usize,
    nodelets: usize,
    degree: Vec<usize>,
    block_range: Vec<(u32, u32)>,
    blocks: Vec<EdgeBlock>,
    targets: Vec<NI>,
    values: Vec<EV>,
}

impl<NI: Idx, EV: Default + Copy + Send + Sync> Graph<NI, EV> {
    /// Builds the graph from a distributed edge list, assumed already
    /// deduplicated (§4.3/§4.4).
    pub fn build(edge_list: &DistEdgeList<NI>, config: &GraphConfig) -> Result<Self, Error> {
        let v = edge_list.num_vertices();
        let nodelets = config.nodelets.max(1);

        // Pass 1: degree counting.
        let degree_cells: Vec<Atomic<usize>> = (0..v).map(|_| Atomic::new(0)).collect();
        {
            let _region = disable_acks();
            edge_list.forall_edges(ExecutionPolicy::dynamic(1024), |u, w| {
                remote_add(&degree_cells[u.index()], 1usize);
                remote_add(&degree_cells[w.index()], 1usize);
            });
        }
        let degree: Vec<usize> = degree_cells.into_iter().map(|c| c.into_inner()).collect();
        debug_assert_eq!(degree.iter().sum::<usize>(), 2 * edge_list.num_edges());

        // Pass 2: block sizing. No edge-list scan needed, only the degrees
        // just computed.
        let mut num_blocks = vec![1usize; v];
        let mut block_range = vec![(0u32, 0u32); v];
        let mut blocks: Vec<EdgeBlock> = Vec::new();
        let mut cursor = 0u32;
        for vid in 0..v {
            let nb = if config.sort_adjacency {
                1
            } else {
                blocks_for_degree(degree[vid], config.block_grain, nodelets)
            };
            num_blocks[vid] = nb;
            block_range[vid] = (cursor, cursor + nb as u32);
            cursor += nb as u32;
            for _ in 0..nb {
                blocks.push(EdgeBlock { start: 0, len: 0 });
            }
        }

        // Pass 3a (carve): count how many edges land in each block.
        let block_counts: Vec<Atomic<usize>> = (0..blocks.len()).map(|_| Atomic::new(0)).collect();
        {
            let _region = disable_acks();
            edge_list.forall_edges(ExecutionPolicy::dynamic(1024), |u, w| {
                let bu = block_index(u.index(), w.index(), num_blocks[u.index()], block_range[u.index()]);
                remote_add(&block_counts[bu], 1usize);
                let bw = block_index(w.index(), u.index(), num_blocks[w.index()], block_range[w.index()]);
                remote_add(&block_counts[bw], 1usize);
            });
        }

        let mut offset = 0usize;
        for (block, count) in blocks.iter_mut().zip(block_counts.iter()) {
            let len = count.load(Ordering::Acquire);
            block.start = offset;
            block.len = len;
            offset += len;
        }
        let total = offset;
        debug_assert_eq!(total, 2 * edge_list.num_edges());

        let mut targets = vec![NI::zero(); total];
        let mut values = vec![EV::default(); total];
        let insert_cursor: Vec<Atomic<usize>> = (0..blocks.len()).map(|_| Atomic::new(0)).collect();

        // Pass 3b (fill): scan the edge list once more and place each
        // endpoint's record into its block via an atomic insertion cursor.
        {
            let target_ptr = SharedMut::new(targets.as_mut_ptr());
            let _region = disable_acks();
            edge_list.forall_edges(ExecutionPolicy::dynamic(1024), |u, w| {
                place(u.index(), w, &num_blocks, &block_range, &blocks, &insert_cursor, target_ptr);
                place(w.index(), u, &num_blocks, &block_range, &blocks, &insert_cursor, target_ptr);
            });
        }

        if config.sort_adjacency {
            let target_ptr = SharedMut::new(targets.as_mut_ptr());
            let value_ptr = SharedMut::new(values.as_mut_ptr());
            parallel_for(ExecutionPolicy::dynamic(64), v, |vid| {
                let (lo, _) = block_range[vid];
                let block = blocks[lo as usize];
                if block.len <= 1 {
                    return;
                }
                // SAFETY: each vertex owns a disjoint `[start, start+len)`
                // range; no two tasks touch the same slice.
                unsafe {
                    let slice = std::slice::from_raw_parts_mut(target_ptr.add(block.start), block.len);
                    let vslice = std::slice::from_raw_parts_mut(value_ptr.add(block.start), block.len);
                    let mut paired: Vec<(NI, EV)> =
                        slice.iter().copied().zip(vslice.iter().copied()).collect();
                    paired.sort_unstable_by_key(|(dst, _)| *dst);
                    for (i, (dst, val)) in paired.into_iter().enumerate() {
                        slice[i] = dst;
                        vslice[i] = val;
                    }
                }
            });
        }

        info!(
            "constructed graph: {} vertices, {} edges, {} edge blocks, sorted={}",
            v,
            edge_list.num_edges(),
            blocks.len(),
            config.sort_adjacency
        );

        Ok(Graph {
            num_vertices: v,
            num_edges: edge_list.num_edges(),
            nodelets,
            degree,
            block_range,
            blocks,
            targets,
            values,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn nodelets(&self) -> usize {
        self.nodelets
    }

    pub fn degree(&self, v: usize) -> usize {
        self.degree[v]
    }

    pub fn num_edge_blocks(&self, v: usize) -> usize {
        let (lo, hi) = self.block_range[v];
        (hi - lo) as usize
    }

    pub fn edge_blocks(&self, v: usize) -> &[EdgeBlock] {
        let (lo, hi) = self.block_range[v];
        &self.blocks[lo as usize..hi as usize]
    }

    /// Every neighbor of `v`, walked block by block, in block order. Valid
    /// for any graph regardless of block count; does not assume sortedness.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = NI> + '_ {
        self.edge_blocks(v)
            .iter()
            .flat_map(move |b| self.targets[b.start..b.start + b.len].iter().copied())
    }

    pub fn neighbors_with_values(&self, v: usize) -> impl Iterator<Item = (NI, &EV)> + '_ {
        self.edge_blocks(v).iter().flat_map(move |b| {
            self.targets[b.start..b.start + b.len]
                .iter()
                .copied()
                .zip(self.values[b.start..b.start + b.len].iter())
        })
    }

    /// The neighbor at position `i` in `v`'s adjacency, counting across edge
    /// blocks in block order. Used by work-list-driven kernels that claim
    /// sub-ranges of a vertex's own adjacency dynamically (§4.5) rather than
    /// walking it with [`Graph::neighbors`].
    pub fn neighbor_at(&self, v: usize, i: usize) -> NI {
        let mut remaining = i;
        for b in self.edge_blocks(v) {
            if remaining < b.len {
                return self.targets[b.start + remaining];
            }
            remaining -= b.len;
        }
        panic!("neighbor index {i} out of range for vertex {v} (degree {})", self.degree[v]);
    }

    /// The full adjacency as one ascending-sorted slice. Only valid on a
    /// graph built with `sort_adjacency = true`, where every vertex
    /// collapses to exactly one block; panics otherwise.
    pub fn sorted_adjacency(&self, v: usize) -> &[NI] {
        assert_eq!(self.num_edge_blocks(v), 1, "sorted_adjacency requires a single-block graph");
        let block = self.edge_blocks(v)[0];
        &self.targets[block.start..block.start + block.len]
    }

    /// The flat position of `v`'s sorted adjacency in the shared edge arena.
    /// Combined with a position within `sorted_adjacency(v)`, this gives a
    /// stable per-arc identifier that ordered-intersection kernels (triangle
    /// count, k-truss) use to address per-edge scratch state. Only valid on
    /// a single-block graph; panics otherwise.
    pub fn edge_offset(&self, v: usize) -> usize {
        assert_eq!(self.num_edge_blocks(v), 1, "edge_offset requires a single-block graph");
        self.edge_blocks(v)[0].start
    }

    pub fn sorted_adjacency_values(&self, v: usize) -> &[EV] {
        assert_eq!(self.num_edge_blocks(v), 1, "sorted_adjacency requires a single-block graph");
        let block = self.edge_blocks(v)[0];
        &self.values[block.start..block.start + block.len]
    }

    /// Edge-block walker (§4.5): iterates `v`'s blocks in sequence, spawning
    /// one task per block (the original's one-migration-per-block), then
    /// runs `policy` over that block's slots locally.
    pub fn for_each_out_edge<F>(&self, v: usize, policy: ExecutionPolicy, f: F)
    where
        F: Fn(NI, &EV) + Sync + Send,
    {
        rayon::scope(|scope| {
            for block in self.edge_blocks(v) {
                let targets = &self.targets[block.start..block.start + block.len];
                let values = &self.values[block.start..block.start + block.len];
                let f = &f;
                scope.spawn(move |_| {
                    parallel_for(policy, targets.len(), |i| f(targets[i], &values[i]));
                });
            }
        });
    }

    /// Slow verification (§4.4): confirms every edge in `edge_list` is
    /// present in both endpoints' adjacency, and that no adjacency holds a
    /// duplicate once sorted.
    pub fn check(&self, edge_list: &DistEdgeList<NI>) -> bool {
        let mut ok = true;
        edge_list.forall_edges(ExecutionPolicy::Sequenced, |u, w| {
            if !self.neighbors(u.index()).any(|x| x == w) {
                ok = false;
            }
            if !self.neighbors(w.index()).any(|x| x == u) {
                ok = false;
            }
        });
        for vid in 0..self.num_vertices {
            if self.num_edge_blocks(vid) == 1 {
                let adj = self.sorted_adjacency(vid);
                if adj.windows(2).any(|w| w[0] == w[1]) {
                    ok = false;
                }
            }
        }
        ok
    }
}

fn blocks_for_degree(degree: usize, block_grain: usize, nodelets: usize) -> usize {
    if degree == 0 {
        return 1;
    }
    let needed = div_ceil(degree, block_grain.max(1));
    next_pow2(needed).min(nodelets.max(1))
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b.max(1)
}

fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// Selects which of `src`'s blocks edge `(src, dst)` belongs to: the
/// destination's low bits index into the power-of-two block count (§3).
fn block_index(_src: usize, dst: usize, num_blocks: usize, range: (u32, u32)) -> usize {
    range.0 as usize + (dst & (num_blocks - 1))
}

#[allow(clippy::too_many_arguments)]
fn place<NI: Idx>(
    src: usize,
    dst: NI,
    num_blocks: &[usize],
    block_range: &[(u32, u32)],
    blocks: &[EdgeBlock],
    insert_cursor: &[Atomic<usize>],
    target_ptr: SharedMut<NI>,
) {
    let b = block_index(src, dst.index(), num_blocks[src], block_range[src]);
    let slot = insert_cursor[b].fetch_add(1, Ordering::AcqRel);
    let block = blocks[b];
    debug_assert!(slot < block.len);
    // SAFETY: `insert_cursor[b]` hands out each slot in `[0, block.len)`
    // exactly once, and `block.start` ranges are disjoint across blocks.
    unsafe {
        *target_ptr.add(block.start + slot) = dst;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_path_graph() -> (DistEdgeList<usize>, Graph<usize, ()>) {
        let src = vec![0usize, 1, 2];
        let dst = vec![1usize, 2, 3];
        let el = DistEdgeList::from_edges(src, dst, 4);
        let config = GraphConfig { block_grain: 1024, nodelets: 4, sort_adjacency: false };
        let graph = Graph::<usize, ()>::build(&el, &config).unwrap();
        (el, graph)
    }

    #[test]
    fn degree_sums_to_twice_edge_count() {
        let (_el, graph) = build_path_graph();
        let total: usize = (0..graph.num_vertices()).map(|v| graph.degree(v)).sum();
        assert_eq!(total, 2 * graph.num_edges());
    }

    #[test]
    fn adjacency_matches_edge_list() {
        let (el, graph) = build_path_graph();
        assert!(graph.check(&el));

        let mut neighbors_of_1: Vec<usize> = graph.neighbors(1).collect();
        neighbors_of_1.sort_unstable();
        assert_eq!(neighbors_of_1, vec![0, 2]);
    }

    #[test]
    fn sorted_adjacency_is_ascending_with_no_duplicates() {
        let src = vec![0usize, 0, 0, 1];
        let dst = vec![1usize, 2, 3, 3];
        let el = DistEdgeList::from_edges(src, dst, 4);
        let config = GraphConfig { block_grain: 1024, nodelets: 4, sort_adjacency: true };
        let graph = Graph::<usize, ()>::build(&el, &config).unwrap();

        assert_eq!(graph.num_edge_blocks(0), 1);
        let adj = graph.sorted_adjacency(0);
        assert_eq!(adj, &[1, 2, 3]);
        assert!(adj.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn high_degree_vertex_splits_into_multiple_blocks() {
        let n = 5000usize;
        let src = vec![0usize; n];
        let dst: Vec<usize> = (1..=n).collect();
        let el = DistEdgeList::from_edges(src, dst, n + 1);
        let config = GraphConfig { block_grain: 1024, nodelets: 8, sort_adjacency: false };
        let graph = Graph::<usize, ()>::build(&el, &config).unwrap();

        assert!(graph.num_edge_blocks(0) > 1);
        assert_eq!(graph.degree(0), n);
        let total_in_blocks: usize = graph.edge_blocks(0).iter().map(|b| b.len).sum();
        assert_eq!(total_in_blocks, n);
    }
}
