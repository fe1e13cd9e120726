//! `SlidingQueue` — a multi-window append-only buffer used to implement
//! level-synchronous BFS frontiers.
//!
//! Each nodelet replica owns a private append buffer and three monotone
//! cursors `start <= end <= next`. `push_back` claims a slot with a single
//! fetch-add; `slide_window` closes the current window and opens the next
//! one; `forall_items` dynamically pulls items out of the current window
//! across every replica.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bitmap::Bitmap;

struct Partition {
    buffer: Vec<i64>,
    next: AtomicUsize,
    start: usize,
    end: usize,
}

impl Partition {
    fn new(capacity: usize) -> Self {
        Partition { buffer: vec![0; capacity.max(1)], next: AtomicUsize::new(0), start: 0, end: 0 }
    }

    fn reset(&mut self) {
        self.next.store(0, Ordering::Relaxed);
        self.start = 0;
        self.end = 0;
    }

    fn push_back(&self, v: i64) {
        let pos = self.next.fetch_add(1, Ordering::AcqRel);
        // SAFETY: capacity is sized to the graph's vertex count and callers
        // never push more items per window than fit; mirrors the original's
        // reliance on a pre-sized buffer.
        unsafe {
            let ptr = self.buffer.as_ptr() as *mut i64;
            ptr.add(pos).write(v);
        }
    }

    fn slide_window(&mut self) {
        self.start = self.end;
        self.end = self.next.load(Ordering::Acquire);
    }

    fn window(&self) -> &[i64] {
        &self.buffer[self.start..self.end]
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn size(&self) -> usize {
        self.end - self.start
    }
}

/// Per-nodelet sliding queue. One partition per nodelet replica; `push_back`
/// appends to whichever partition is addressed (mirroring the original's
/// "append on the caller's current nodelet" rule — here the caller picks
/// the partition explicitly via [`SlidingQueue::partition`]).
pub struct SlidingQueue {
    partitions: Vec<Partition>,
}

impl SlidingQueue {
    pub fn new(capacity: usize, nodelets: usize) -> Self {
        let nodelets = nodelets.max(1);
        SlidingQueue { partitions: (0..nodelets).map(|_| Partition::new(capacity)).collect() }
    }

    pub fn nodelets(&self) -> usize {
        self.partitions.len()
    }

    pub fn push_back(&self, nodelet: usize, v: i64) {
        self.partitions[nodelet % self.partitions.len()].push_back(v);
    }

    pub fn reset_all(&mut self) {
        for p in self.partitions.iter_mut() {
            p.reset();
        }
    }

    pub fn slide_all_windows(&mut self) {
        for p in self.partitions.iter_mut() {
            p.slide_window();
        }
    }

    pub fn all_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.is_empty())
    }

    pub fn combined_size(&self) -> usize {
        self.partitions.iter().map(|p| p.size()).sum()
    }

    /// Visits every item currently in a window, dynamically pulling work
    /// across all partitions rather than walking them one at a time.
    pub fn forall_items<F>(&self, f: F)
    where
        F: Fn(i64) + Sync + Send,
    {
        use rayon::prelude::*;
        self.partitions.par_iter().for_each(|p| {
            p.window().par_iter().for_each(|&v| f(v));
        });
    }

    /// Drains every windowed item into a plain `Vec`, preserving per-nodelet
    /// order (used by tests and by the queue->bitmap conversion).
    pub fn to_vec(&self) -> Vec<i64> {
        self.partitions.iter().flat_map(|p| p.window().iter().copied()).collect()
    }

    /// Converts the current window contents into a bitmap, matching the
    /// original's queue-to-bitmap frontier conversion on a top-down to
    /// bottom-up transition.
    pub fn to_bitmap(&self, len: usize) -> Bitmap {
        let bitmap = Bitmap::new(len, self.partitions.len());
        for v in self.to_vec() {
            bitmap.set_bit(v as usize);
        }
        bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_slide_and_drain() {
        let mut q = SlidingQueue::new(16, 2);
        q.push_back(0, 1);
        q.push_back(1, 2);
        q.push_back(0, 3);
        q.slide_all_windows();

        assert_eq!(q.combined_size(), 3);
        assert!(!q.all_empty());

        let mut v = q.to_vec();
        v.sort_unstable();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn empty_after_reset() {
        let mut q = SlidingQueue::new(8, 2);
        q.push_back(0, 1);
        q.slide_all_windows();
        assert!(!q.all_empty());

        q.reset_all();
        q.slide_all_windows();
        assert!(q.all_empty());
        assert_eq!(q.combined_size(), 0);
    }
}
