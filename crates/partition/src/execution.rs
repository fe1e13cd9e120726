//! Traversal execution policies.
//!
//! The original machine model dispatches loop bodies through a handful of
//! policies depending on how much work per item is expected and how migration
//! should be amortized. On shared memory there is no migration cost, so each
//! policy here differs only in how it slices work across rayon tasks; the
//! policy choice is kept as an explicit, spec-visible knob rather than
//! collapsed into one strategy, since callers reason about it (e.g. BFS picks
//! `Dynamic` for high-degree bottom-up steps and `Fixed` for low-fanout ones).
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// No parallelism; walk the range on the calling thread.
    Sequenced,
    /// One task per nodelet (optionally replicated `threads_per_nodelet`
    /// times), each striding through its statically-owned indices.
    Fixed { nodelets: usize, threads_per_nodelet: usize },
    /// Recursive fork-join bisection down to `grain` elements per leaf.
    Recursive { grain: usize },
    /// Chunks of `grain` elements, claimed dynamically by whichever task
    /// finishes its previous chunk first (work-stealing via rayon).
    Dynamic { grain: usize },
}

impl ExecutionPolicy {
    pub fn fixed(nodelets: usize) -> Self {
        ExecutionPolicy::Fixed { nodelets, threads_per_nodelet: 1 }
    }

    pub fn dynamic(grain: usize) -> Self {
        ExecutionPolicy::Dynamic { grain: grain.max(1) }
    }

    pub fn recursive(grain: usize) -> Self {
        ExecutionPolicy::Recursive { grain: grain.max(1) }
    }
}

/// Runs `f(i)` for every `i` in `0..len`, dispatched per `policy`.
pub fn parallel_for<F>(policy: ExecutionPolicy, len: usize, f: F)
where
    F: Fn(usize) + Sync + Send,
{
    match policy {
        ExecutionPolicy::Sequenced => {
            for i in 0..len {
                f(i);
            }
        }
        ExecutionPolicy::Fixed { nodelets, threads_per_nodelet } => {
            let stride = (nodelets * threads_per_nodelet.max(1)).max(1);
            rayon::scope(|scope| {
                for start in 0..stride {
                    let f = &f;
                    scope.spawn(move |_| {
                        let mut i = start;
                        while i < len {
                            f(i);
                            i += stride;
                        }
                    });
                }
            });
        }
        ExecutionPolicy::Recursive { grain } => {
            fn recurse<F: Fn(usize) + Sync>(lo: usize, hi: usize, grain: usize, f: &F) {
                if hi - lo <= grain {
                    for i in lo..hi {
                        f(i);
                    }
                    return;
                }
                let mid = lo + (hi - lo) / 2;
                rayon::join(|| recurse(lo, mid, grain, f), || recurse(mid, hi, grain, f));
            }
            recurse(0, len, grain, &f);
        }
        ExecutionPolicy::Dynamic { grain } => {
            (0..len).into_par_iter().with_min_len(grain).for_each(|i| f(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn all_policies_visit_every_index_exactly_once() {
        for policy in [
            ExecutionPolicy::Sequenced,
            ExecutionPolicy::fixed(4),
            ExecutionPolicy::recursive(3),
            ExecutionPolicy::dynamic(3),
        ] {
            let seen: Vec<AtomicUsize> = (0..97).map(|_| AtomicUsize::new(0)).collect();
            parallel_for(policy, seen.len(), |i| {
                seen[i].fetch_add(1, Ordering::SeqCst);
            });
            assert!(seen.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        }
    }
}
