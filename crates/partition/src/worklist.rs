//! `WorkList` — a replicated, per-nodelet linked list of
//! `(vertex, edge_range)` records supporting dynamic self-stealing.
//!
//! Mirrors the original's struct-of-arrays linked list: `next_vertex`
//! threads vertices together per nodelet, `head` is the (per-nodelet) list
//! head, and `edges_begin`/`edges_end` bound the edge range still left to
//! process for that vertex. `edges_begin` doubles as shared loop state: it is
//! both what `append` sets up and what `process` mutates as workers claim
//! grains, which is why the worklist is consumed-once per phase (callers
//! call [`WorkList::clear_all`] before rebuilding it for the next round, as
//! connected-components and k-truss both do).

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use crate::intrinsics::atomic_add_saturating;

const WORKERS_PER_NODELET: usize = 16;

pub struct WorkList {
    nodelets: usize,
    heads: Vec<AtomicI64>,
    next_vertex: Vec<AtomicI64>,
    edges_begin: Vec<AtomicUsize>,
    edges_end: Vec<usize>,
}

impl WorkList {
    pub fn new(num_vertices: usize, nodelets: usize) -> Self {
        WorkList {
            nodelets: nodelets.max(1),
            heads: (0..nodelets.max(1)).map(|_| AtomicI64::new(-1)).collect(),
            next_vertex: (0..num_vertices).map(|_| AtomicI64::new(-1)).collect(),
            edges_begin: (0..num_vertices).map(|_| AtomicUsize::new(0)).collect(),
            edges_end: vec![0; num_vertices],
        }
    }

    /// Resets every nodelet's list to empty. Must precede a round of
    /// [`WorkList::append`] calls, since `edges_begin`/`edges_end` are reused
    /// as live loop state by [`WorkList::process_all`].
    pub fn clear_all(&mut self) {
        for h in self.heads.iter_mut() {
            *h.get_mut() = -1;
        }
    }

    /// Atomically pushes `v` onto the head of the list owned by `v`'s home
    /// nodelet, with the edge range `[begin, end)` to process for it.
    pub fn append(&self, v: usize, begin: usize, end: usize) {
        self.edges_begin[v].store(begin, Ordering::Relaxed);
        // SAFETY: `edges_end` is only ever written here, before `process_all`
        // runs, and read thereafter; no concurrent writer exists.
        unsafe {
            let ptr = self.edges_end.as_ptr() as *mut usize;
            ptr.add(v).write(end);
        }

        let home = v % self.nodelets;
        let mut prev = self.heads[home].load(Ordering::Acquire);
        loop {
            self.next_vertex[v].store(prev, Ordering::Relaxed);
            match self.heads[home].compare_exchange_weak(
                prev,
                v as i64,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Processes every `(src, edge_index)` pair still outstanding across all
    /// nodelet lists. `grain` bounds how many edge indices a worker claims
    /// per atomic steal before re-reading the cursor.
    pub fn process_all<F>(&self, grain: usize, f: F)
    where
        F: Fn(usize, usize) + Sync + Send,
    {
        let grain = grain.max(1);
        rayon::scope(|scope| {
            for nodelet in 0..self.nodelets {
                for _ in 0..WORKERS_PER_NODELET {
                    let f = &f;
                    scope.spawn(move |_| {
                        let mut src = self.heads[nodelet].load(Ordering::Acquire);
                        while src >= 0 {
                            let v = src as usize;
                            let end = self.edges_end[v];
                            while let Some((lo, hi)) =
                                atomic_add_saturating(&self.edges_begin[v], grain, end)
                            {
                                for edge_index in lo..hi {
                                    f(v, edge_index);
                                }
                            }
                            src = self.next_vertex[v].load(Ordering::Acquire);
                        }
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[test]
    fn appended_ranges_are_all_visited_exactly_once() {
        let mut wl = WorkList::new(4, 2);
        wl.clear_all();
        wl.append(0, 0, 3);
        wl.append(1, 0, 2);
        wl.append(2, 0, 5);
        wl.append(3, 0, 0);

        let seen: Vec<StdAtomicUsize> = (0..4).map(|_| StdAtomicUsize::new(0)).collect();
        let counts: Vec<StdAtomicUsize> = (0..10).map(|_| StdAtomicUsize::new(0)).collect();

        wl.process_all(1, |src, idx| {
            seen[src].fetch_add(1, Ordering::Relaxed);
            counts[idx].fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(seen[0].load(Ordering::Relaxed), 3);
        assert_eq!(seen[1].load(Ordering::Relaxed), 2);
        assert_eq!(seen[2].load(Ordering::Relaxed), 5);
        assert_eq!(seen[3].load(Ordering::Relaxed), 0);
        for c in &counts[0..5] {
            assert_eq!(c.load(Ordering::Relaxed), 1);
        }
    }
}
