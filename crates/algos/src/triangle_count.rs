//! Ordered-neighbor-intersection triangle count, and its k-truss extension
//! (§4.9). Both require every adjacency sorted ascending, fixing the
//! canonical orientation `u > v > w` so each undirected triangle is counted
//! once.
//!
//! K-truss keeps per-arc `TC` (triangle count), `qrC` and `pRefC` (support
//! bookkeeping for unrolling), addressed by a stable arc id derived from the
//! arc's fixed position in the sorted adjacency arena. The original peels
//! edges by physically partitioning each vertex's edge list so dead edges
//! end up in a shrinking tail; here the same peeling decisions are made
//! against an adjacency that never moves, with a removed arc marked by a
//! non-zero `KTE` instead — the array stays globally sorted throughout, so
//! every lookup that the original did with a raw iterator or `find_out_edge`
//! can stay a binary search or linear scan over an always-valid order.

use std::sync::atomic::Ordering;
use std::time::Instant;

use atomic::Atomic;
use graph_builder::Graph;
use graph_partition::index::Idx;
use graph_partition::intrinsics::{remote_add, remote_max};
use graph_partition::{parallel_for, ExecutionPolicy, WorkList};
use log::info;
use num_format::{Locale, ToFormattedString};

use crate::Error;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct TriangleCountConfig {
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 64))]
    pub chunk_size: usize,
}

impl Default for TriangleCountConfig {
    fn default() -> Self {
        TriangleCountConfig { chunk_size: 64 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TriangleCountResult {
    pub num_triangles: u64,
    pub num_twopaths: u64,
}

/// Standalone global triangle count (§4.9, first paragraph), independent of
/// the k-truss per-edge bookkeeping below. Requires a graph built with
/// `sort_adjacency = true`.
pub fn triangle_count<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    config: &TriangleCountConfig,
) -> TriangleCountResult {
    let start = Instant::now();
    let v = graph.num_vertices();

    let next_chunk = std::sync::atomic::AtomicUsize::new(0);
    let triangles = std::sync::atomic::AtomicU64::new(0);
    let chunk_size = config.chunk_size.max(1);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads().max(1) {
            s.spawn(|_| {
                let mut local_triangles = 0u64;
                loop {
                    let start = next_chunk.fetch_add(chunk_size, Ordering::AcqRel);
                    if start >= v {
                        break;
                    }
                    let end = (start + chunk_size).min(v);

                    for u in start..end {
                        let adj_u = graph.sorted_adjacency(u);
                        let lt_u = adj_u.partition_point(|&x| x.index() < u);

                        for &vn in &adj_u[0..lt_u] {
                            let v_id = vn.index();
                            let adj_v = graph.sorted_adjacency(v_id);
                            let lt_v = adj_v.partition_point(|&x| x.index() < v_id);

                            let mut p = 0usize;
                            for &wn in &adj_v[0..lt_v] {
                                let w = wn.index();
                                while p < lt_u && adj_u[p].index() < w {
                                    p += 1;
                                }
                                if p < lt_u && adj_u[p].index() == w {
                                    local_triangles += 1;
                                }
                            }
                        }
                    }
                }
                triangles.fetch_add(local_triangles, Ordering::AcqRel);
            });
        }
    });

    // Two-paths (wedges) centered at each vertex: choosing 2 of its
    // neighbors, C(deg(v), 2), summed over every vertex — independent of the
    // intersection work above, which only probes a subset of wedges.
    let twopaths: u64 = (0..v)
        .map(|vid| {
            let d = graph.degree(vid) as u64;
            d * d.saturating_sub(1) / 2
        })
        .sum();

    let result = TriangleCountResult {
        num_triangles: triangles.load(Ordering::SeqCst),
        num_twopaths: twopaths,
    };
    info!(
        "counted {} triangles ({} two-paths examined) in {:?}",
        result.num_triangles.to_formatted_string(&Locale::en),
        result.num_twopaths.to_formatted_string(&Locale::en),
        start.elapsed()
    );
    result
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct KTrussConfig {
    /// Edge sub-range claimed per work-list steal.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 64))]
    pub grain: usize,
    /// Optional ceiling on how high `k` is allowed to climb before the peel
    /// loop is forced to stop, regardless of whether edges remain.
    #[cfg_attr(feature = "clap", clap(long))]
    pub k_limit: Option<usize>,
}

impl Default for KTrussConfig {
    fn default() -> Self {
        KTrussConfig { grain: 64, k_limit: None }
    }
}

#[derive(Debug, Clone)]
pub struct KTrussResult {
    pub max_k: usize,
    /// `edges_per_truss[k - 2]` is the number of edges in the `k`-truss.
    pub edges_per_truss: Vec<usize>,
    /// `vertices_per_truss[k - 2]` is the number of vertices with an edge at
    /// truss level `k` or higher.
    pub vertices_per_truss: Vec<usize>,
}

impl KTrussResult {
    pub fn edges_at(&self, k: usize) -> usize {
        if k < 2 {
            return 0;
        }
        self.edges_per_truss.get(k - 2).copied().unwrap_or(0)
    }

    pub fn vertices_at(&self, k: usize) -> usize {
        if k < 2 {
            return 0;
        }
        self.vertices_per_truss.get(k - 2).copied().unwrap_or(0)
    }
}

/// Every arc's mutable bookkeeping, addressed by its fixed position in the
/// sorted adjacency arena.
struct ArcState {
    tc: Vec<Atomic<i64>>,
    qr_c: Vec<Atomic<i64>>,
    p_ref_c: Vec<Atomic<i64>>,
    kte: Vec<Atomic<i64>>,
}

impl ArcState {
    fn new(total_arcs: usize) -> Self {
        ArcState {
            tc: (0..total_arcs).map(|_| Atomic::new(0)).collect(),
            qr_c: (0..total_arcs).map(|_| Atomic::new(0)).collect(),
            p_ref_c: (0..total_arcs).map(|_| Atomic::new(0)).collect(),
            kte: (0..total_arcs).map(|_| Atomic::new(0)).collect(),
        }
    }

    fn is_removed(&self, id: usize) -> bool {
        self.kte[id].load(Ordering::Acquire) != 0
    }
}

fn arc_id<NI: Idx, EV>(graph: &Graph<NI, EV>, v: usize, pos: usize) -> usize {
    graph.edge_offset(v) + pos
}

/// Position of `p` within `v`'s sorted adjacency, via binary search.
fn find_pos<NI: Idx, EV>(graph: &Graph<NI, EV>, v: usize, p: usize) -> Option<usize> {
    graph.sorted_adjacency(v).binary_search_by_key(&p, |x| x.index()).ok()
}

fn find_arc_id<NI: Idx, EV>(graph: &Graph<NI, EV>, v: usize, p: usize) -> usize {
    let pos = find_pos(graph, v, p).expect("reverse arc must exist in a symmetric graph");
    arc_id(graph, v, pos)
}

fn active_prefix_len<NI: Idx, EV>(graph: &Graph<NI, EV>, v: usize) -> usize {
    graph.sorted_adjacency(v).partition_point(|&x| x.index() < v)
}

fn build_truss_worklist<NI: Idx, EV>(graph: &Graph<NI, EV>, worklist: &mut WorkList) {
    worklist.clear_all();
    parallel_for(ExecutionPolicy::dynamic(64), graph.num_vertices(), |v| {
        let lt = active_prefix_len(graph, v);
        if lt > 0 {
            worklist.append(v, 0, lt);
        }
    });
}

fn count_initial_triangles<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    arcs: &ArcState,
    grain: usize,
) {
    let mut worklist = WorkList::new(graph.num_vertices(), graph.nodelets());
    build_truss_worklist(graph, &mut worklist);

    worklist.process_all(grain, |p, i| {
        let adj_p = graph.sorted_adjacency(p);
        let lt_p = active_prefix_len(graph, p);
        let q = adj_p[i].index();
        let pq_id = arc_id(graph, p, i);

        let adj_q = graph.sorted_adjacency(q);
        let lt_q = active_prefix_len(graph, q);
        let qp_id = find_arc_id(graph, q, p);

        for (j, &rn) in adj_q[0..lt_q].iter().enumerate() {
            let r = rn.index();
            if let Some(pos) = adj_p[0..lt_p].binary_search_by_key(&r, |x| x.index()).ok() {
                let qr_id = arc_id(graph, q, j);
                let pr_id = arc_id(graph, p, pos);
                remote_add(&arcs.tc[qr_id], 1i64);
                remote_add(&arcs.tc[pq_id], 1i64);
                remote_add(&arcs.tc[pr_id], 1i64);
                remote_add(&arcs.qr_c[qr_id], 1i64);
                remote_add(&arcs.p_ref_c[qp_id], 1i64);
            }
        }
    });
}

fn unroll_wedges<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    arcs: &ArcState,
    k: i64,
    grain: usize,
) {
    let mut worklist = WorkList::new(graph.num_vertices(), graph.nodelets());
    build_truss_worklist(graph, &mut worklist);

    worklist.process_all(grain, |p, i| {
        let pq_id = arc_id(graph, p, i);
        if arcs.is_removed(pq_id) {
            return;
        }
        let adj_p = graph.sorted_adjacency(p);
        let q = adj_p[i].index();
        let lt_p = active_prefix_len(graph, p);

        if arcs.tc[pq_id].load(Ordering::Acquire) < k - 2 {
            let adj_q = graph.sorted_adjacency(q);
            let lt_q = active_prefix_len(graph, q);
            let qp_id = find_arc_id(graph, q, p);

            for (j, &rn) in adj_q[0..lt_q].iter().enumerate() {
                let qr_id = arc_id(graph, q, j);
                if arcs.is_removed(qr_id) {
                    continue;
                }
                let r = rn.index();
                if let Some(pos) = adj_p[0..lt_p].binary_search_by_key(&r, |x| x.index()).ok() {
                    let pr_id = arc_id(graph, p, pos);
                    if arcs.is_removed(pr_id) {
                        continue;
                    }
                    remote_add(&arcs.tc[qr_id], -1i64);
                    remote_add(&arcs.tc[pq_id], -1i64);
                    remote_add(&arcs.tc[pr_id], -1i64);
                    remote_add(&arcs.qr_c[qr_id], -1i64);
                    remote_add(&arcs.p_ref_c[qp_id], -1i64);
                }
            }
        } else {
            let lt_q_in_p = adj_p.partition_point(|&x| x.index() < q);
            let adj_q = graph.sorted_adjacency(q);
            let qp_id = find_arc_id(graph, q, p);

            for pos in 0..lt_q_in_p {
                let pr_id = arc_id(graph, p, pos);
                if arcs.is_removed(pr_id) {
                    continue;
                }
                if arcs.tc[pr_id].load(Ordering::Acquire) < k - 2 {
                    let r = adj_p[pos].index();
                    if let Some(jq) = adj_q.binary_search_by_key(&r, |x| x.index()).ok() {
                        let qr_id = arc_id(graph, q, jq);
                        if arcs.is_removed(qr_id) {
                            continue;
                        }
                        remote_add(&arcs.tc[qr_id], -1i64);
                        remote_add(&arcs.tc[pq_id], -1i64);
                        remote_add(&arcs.tc[pr_id], -1i64);
                        remote_add(&arcs.qr_c[qr_id], -1i64);
                        remote_add(&arcs.p_ref_c[qp_id], -1i64);
                    }
                }
            }
        }
    });
}

fn unroll_supported_triangles<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    arcs: &ArcState,
    k: i64,
    grain: usize,
) {
    let mut worklist = WorkList::new(graph.num_vertices(), graph.nodelets());
    build_truss_worklist(graph, &mut worklist);

    worklist.process_all(grain, |q, j| {
        let qr_id = arc_id(graph, q, j);
        if arcs.is_removed(qr_id) {
            return;
        }
        if arcs.tc[qr_id].load(Ordering::Acquire) >= k - 2 || arcs.qr_c[qr_id].load(Ordering::Acquire) <= 0 {
            return;
        }
        let r = graph.sorted_adjacency(q)[j].index();
        let adj_q = graph.sorted_adjacency(q);
        let start = adj_q.partition_point(|&x| x.index() <= q);

        for (pos, &pn) in adj_q.iter().enumerate().skip(start) {
            let qp_id = arc_id(graph, q, pos);
            if arcs.p_ref_c[qp_id].load(Ordering::Acquire) <= 0 {
                continue;
            }
            let p = pn.index();
            let pq_id = find_arc_id(graph, p, q);
            let pr_id = find_arc_id(graph, p, r);
            remote_add(&arcs.tc[qr_id], -1i64);
            remote_add(&arcs.tc[pq_id], -1i64);
            remote_add(&arcs.tc[pr_id], -1i64);
            remote_add(&arcs.qr_c[qr_id], -1i64);
        }
    });
}

fn remove_edges<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    arcs: &ArcState,
    k: i64,
) -> usize {
    let removed = Atomic::new(0usize);
    parallel_for(ExecutionPolicy::dynamic(64), graph.num_vertices(), |v| {
        let lt = active_prefix_len(graph, v);
        for i in 0..lt {
            let id = arc_id(graph, v, i);
            if arcs.is_removed(id) {
                continue;
            }
            if arcs.tc[id].load(Ordering::Acquire) == 0 {
                arcs.kte[id].store(k - 1, Ordering::Release);
                remote_add(&removed, 1usize);
            }
        }
    });
    removed.into_inner()
}

fn compute_truss_sizes<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    arcs: &ArcState,
    max_k: usize,
) -> KTrussResult {
    if max_k < 2 {
        return KTrussResult { max_k, edges_per_truss: Vec::new(), vertices_per_truss: Vec::new() };
    }
    let v = graph.num_vertices();
    let vertex_max_k: Vec<Atomic<i64>> = (0..v).map(|_| Atomic::new(0)).collect();
    let edges_per_truss: Vec<Atomic<usize>> = (0..max_k - 1).map(|_| Atomic::new(0)).collect();

    parallel_for(ExecutionPolicy::dynamic(64), v, |src| {
        let lt = active_prefix_len(graph, src);
        let adj = graph.sorted_adjacency(src);
        for i in 0..lt {
            let id = arc_id(graph, src, i);
            let dst = adj[i].index();
            let kte_val = arcs.kte[id].load(Ordering::Acquire);
            debug_assert!(kte_val >= 2);
            remote_max(&vertex_max_k[src], kte_val);
            remote_max(&vertex_max_k[dst], kte_val);
            for k in 2..=kte_val as usize {
                remote_add(&edges_per_truss[k - 2], 1usize);
            }
        }
    });

    let vertices_per_truss: Vec<Atomic<usize>> = (0..max_k - 1).map(|_| Atomic::new(0)).collect();
    parallel_for(ExecutionPolicy::dynamic(64), v, |vid| {
        let vmax = vertex_max_k[vid].load(Ordering::Acquire);
        for k in 2..=max_k {
            if k as i64 <= vmax {
                remote_add(&vertices_per_truss[k - 2], 1usize);
            }
        }
    });

    KTrussResult {
        max_k,
        edges_per_truss: edges_per_truss.into_iter().map(|a| a.into_inner()).collect(),
        vertices_per_truss: vertices_per_truss.into_iter().map(|a| a.into_inner()).collect(),
    }
}

/// Runs the full k-truss peeling engine (§4.9). Requires a graph built with
/// `sort_adjacency = true`.
pub fn k_truss<NI: Idx, EV: Default + Copy + Send + Sync>(
    graph: &Graph<NI, EV>,
    config: &KTrussConfig,
) -> Result<KTrussResult, Error> {
    if let Some(limit) = config.k_limit {
        if limit < 3 {
            return Err(Error::KBelowMinimum { k_limit: limit });
        }
    }

    let start = Instant::now();
    let total_arcs: usize = (0..graph.num_vertices()).map(|v| graph.degree(v)).sum();
    let arcs = ArcState::new(total_arcs);

    count_initial_triangles(graph, &arcs, config.grain);

    let mut k: i64 = 3;
    let mut edges_remaining = graph.num_edges();
    let mut forced_stop = false;
    loop {
        loop {
            unroll_wedges(graph, &arcs, k, config.grain);
            unroll_supported_triangles(graph, &arcs, k, config.grain);
            let removed = remove_edges(graph, &arcs, k);
            edges_remaining -= removed;
            if removed == 0 {
                break;
            }
        }
        info!("found the {}-truss, {} edges remaining", k, edges_remaining);
        k += 1;
        if edges_remaining == 0 {
            break;
        }
        if let Some(limit) = config.k_limit {
            if k > limit as i64 {
                forced_stop = true;
                break;
            }
        }
    }
    let max_k = if forced_stop { (k - 1).max(0) as usize } else { (k - 2).max(0) as usize };

    let result = compute_truss_sizes(graph, &arcs, max_k);
    info!("k-truss finished: max_k={} in {:?}", result.max_k, start.elapsed());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_builder::{DistEdgeList, GraphConfig};

    fn triangle_graph() -> Graph<usize, ()> {
        let el = DistEdgeList::from_edges(vec![0usize, 1, 0], vec![1usize, 2, 2], 3);
        let config = GraphConfig { sort_adjacency: true, ..GraphConfig::default() };
        Graph::build(&el, &config).unwrap()
    }

    fn star_graph() -> Graph<usize, ()> {
        let el = DistEdgeList::from_edges(vec![0usize, 0, 0, 0], vec![1usize, 2, 3, 4], 5);
        let config = GraphConfig { sort_adjacency: true, ..GraphConfig::default() };
        Graph::build(&el, &config).unwrap()
    }

    #[test]
    fn s2_single_triangle_has_one_triangle() {
        let graph = triangle_graph();
        let result = triangle_count(&graph, &TriangleCountConfig::default());
        assert_eq!(result.num_triangles, 1);
        assert_eq!(result.num_twopaths, 3);
    }

    #[test]
    fn s4_star_has_no_triangles() {
        let graph = star_graph();
        let result = triangle_count(&graph, &TriangleCountConfig::default());
        assert_eq!(result.num_triangles, 0);
    }

    #[test]
    fn s2_single_triangle_is_a_3_truss() {
        let graph = triangle_graph();
        let result = k_truss(&graph, &KTrussConfig::default()).unwrap();
        assert_eq!(result.max_k, 3);
        assert_eq!(result.edges_at(2), 3);
        assert_eq!(result.edges_at(3), 3);
        assert_eq!(result.vertices_at(3), 3);
    }

    #[test]
    fn s4_star_with_no_triangles_is_a_2_truss() {
        let graph = star_graph();
        let result = k_truss(&graph, &KTrussConfig::default()).unwrap();
        assert_eq!(result.max_k, 2);
        assert_eq!(result.edges_at(2), 4);
    }

    #[test]
    fn k_limit_below_three_is_rejected() {
        let graph = star_graph();
        let config = KTrussConfig { k_limit: Some(2), ..KTrussConfig::default() };
        assert!(matches!(k_truss(&graph, &config), Err(Error::KBelowMinimum { .. })));
    }
}
