//! `Replicated<T>` — one independent copy of `T` per nodelet, plus
//! `Shared<T>` — a non-owning reference held by every kernel that only reads
//! the constructed graph, replacing the original's shallow-copy constructor
//! idiom with ordinary Rust reference counting (`Arc` already gives
//! exactly-once teardown, which is all the shallow-copy constructor was
//! emulating by hand).

use std::sync::Arc;

/// One value per nodelet. Kernels that accumulate a scalar per nodelet before
/// a final reduction (e.g. BFS's per-nodelet scout/awake counters) use this
/// instead of a single shared atomic, to mirror the original's replicated
/// locals and avoid unnecessary cross-nodelet contention in spirit even
/// though, physically, these live in the same process.
#[derive(Debug, Clone)]
pub struct Replicated<T> {
    copies: Vec<T>,
}

impl<T: Clone> Replicated<T> {
    pub fn new(nodelets: usize, init: T) -> Self {
        Replicated { copies: vec![init; nodelets.max(1)] }
    }
}

impl<T> Replicated<T> {
    pub fn from_copies(copies: Vec<T>) -> Self {
        assert!(!copies.is_empty());
        Replicated { copies }
    }

    pub fn nodelets(&self) -> usize {
        self.copies.len()
    }

    pub fn get(&self, nodelet: usize) -> &T {
        &self.copies[nodelet % self.copies.len()]
    }

    pub fn get_mut(&mut self, nodelet: usize) -> &mut T {
        let n = self.copies.len();
        &mut self.copies[nodelet % n]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.copies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.copies.iter_mut()
    }

    /// Combines every replicated copy into a single value, matching the
    /// original's pattern of summing per-nodelet scratch counters once a
    /// kernel step finishes.
    pub fn reduce<B>(&self, init: B, mut f: impl FnMut(B, &T) -> B) -> B {
        self.copies.iter().fold(init, |acc, c| f(acc, c))
    }
}

/// A cheaply-cloneable, non-owning handle to a constructed, immutable graph.
/// Every kernel holds one of these rather than taking ownership, mirroring
/// the source's convention that graph kernels operate on a shallow-copied,
/// read-only view.
pub type Shared<T> = Arc<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_sums_replicated_counters() {
        let mut r = Replicated::new(4, 0i64);
        for n in 0..4 {
            *r.get_mut(n) = n as i64;
        }
        assert_eq!(r.reduce(0i64, |acc, v| acc + v), 0 + 1 + 2 + 3);
    }
}
