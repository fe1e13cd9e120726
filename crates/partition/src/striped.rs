//! `StripedArray<T>` — one logical array distributed element-`i` to
//! nodelet `i % nodelets()`.
//!
//! On real partitioned-memory hardware this controls physical placement; on
//! shared memory the placement is a bookkeeping fiction, but the striping
//! function is kept so that callers that reason about "which nodelet owns
//! element i" (the work-list's head selection, the bitmap's bit ownership)
//! get the same answer this would give on the original machine.

use std::sync::atomic::Ordering;

use atomic::Atomic;

use crate::execution::{parallel_for, ExecutionPolicy};
use crate::index::Idx;

/// Owning, growable-at-construction-time striped storage.
pub struct StripedArray<T> {
    data: Box<[T]>,
    nodelets: usize,
}

impl<T: Clone> StripedArray<T> {
    pub fn new(len: usize, nodelets: usize, init: T) -> Self {
        StripedArray { data: vec![init; len].into_boxed_slice(), nodelets: nodelets.max(1) }
    }
}

impl<T> StripedArray<T> {
    pub fn from_vec(data: Vec<T>, nodelets: usize) -> Self {
        StripedArray { data: data.into_boxed_slice(), nodelets: nodelets.max(1) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The nodelet that logically owns index `i`.
    pub fn home(&self, i: usize) -> usize {
        i % self.nodelets
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get(&self, i: usize) -> &T {
        &self.data[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T: Sync> StripedArray<T> {
    /// Visits every element in parallel, striding by nodelet count so that
    /// each spawned task only ever touches elements it is the logical home
    /// of, matching the original's per-nodelet worker placement.
    pub fn par_for_each<F>(&self, f: F)
    where
        F: Fn(usize, &T) + Sync + Send,
    {
        let policy = ExecutionPolicy::fixed(self.nodelets);
        parallel_for(policy, self.data.len(), |i| f(i, &self.data[i]));
    }
}

impl<T: Idx> StripedArray<Atomic<T>> {
    pub fn zeroed(len: usize, nodelets: usize) -> Self
    where
        T: Default,
    {
        let data: Vec<_> = (0..len).map(|_| Atomic::new(T::zero())).collect();
        StripedArray::from_vec(data, nodelets)
    }

    pub fn load(&self, i: usize, order: Ordering) -> T {
        self.data[i].load(order)
    }

    pub fn store(&self, i: usize, value: T, order: Ordering) {
        self.data[i].store(value, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_wraps_around_nodelet_count() {
        let arr: StripedArray<u32> = StripedArray::new(10, 4, 0);
        assert_eq!(arr.home(0), 0);
        assert_eq!(arr.home(4), 0);
        assert_eq!(arr.home(5), 1);
    }

    #[test]
    fn par_for_each_visits_everything() {
        let arr: StripedArray<u32> = StripedArray::from_vec((0..1000).collect(), 8);
        let sum = std::sync::atomic::AtomicU64::new(0);
        arr.par_for_each(|_, v| {
            sum.fetch_add(*v as u64, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), (0..1000u64).sum());
    }
}
