//! `Bitmap` — a bit-striped (not word-striped) bit vector.
//!
//! Bit `i` logically lives on nodelet `i % nodelets`. On the original
//! machine this matters for which nodelet physically holds the backing word;
//! here it only changes how words are assigned to bit indices, which we keep
//! so that the access pattern (`word_offset`/`bit_offset`) matches the
//! original exactly, including for the per-nodelet replica dump used by
//! BFS's queue/bitmap conversion.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::intrinsics::remote_or;

const BITS_PER_WORD: usize = 64;

pub struct Bitmap {
    words: Box<[AtomicU64]>,
    nodelets: usize,
    len: usize,
}

impl Bitmap {
    pub fn new(len: usize, nodelets: usize) -> Self {
        let nodelets = nodelets.max(1);
        let words_per_nodelet = div_round_up(len, BITS_PER_WORD * nodelets);
        let num_words = nodelets * words_per_nodelet;
        let words = (0..num_words.max(1)).map(|_| AtomicU64::new(0)).collect();
        Bitmap { words, nodelets, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn word_offset(&self, n: usize) -> usize {
        self.nodelets * (n / (BITS_PER_WORD * self.nodelets)) + n % self.nodelets
    }

    fn bit_offset(&self, n: usize) -> u32 {
        ((n / self.nodelets) % BITS_PER_WORD) as u32
    }

    pub fn clear(&self) {
        for w in self.words.iter() {
            w.store(0, Ordering::Relaxed);
        }
    }

    pub fn test(&self, pos: usize) -> bool {
        let word = self.word_offset(pos);
        let bit = self.bit_offset(pos);
        (self.words[word].load(Ordering::Acquire) & (1u64 << bit)) != 0
    }

    pub fn set_bit(&self, pos: usize) {
        let word = self.word_offset(pos);
        let bit = self.bit_offset(pos);
        remote_or(&self.words[word], 1u64 << bit);
    }

    /// Returns every set bit index, in ascending order.
    pub fn dump(&self) -> Vec<usize> {
        (0..self.len).filter(|&i| self.test(i)).collect()
    }

    pub fn par_for_each_set<F>(&self, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        use rayon::prelude::*;
        (0..self.len).into_par_iter().for_each(|i| {
            if self.test(i) {
                f(i);
            }
        });
    }

    pub fn any_set(&self) -> bool {
        self.words.iter().any(|w| w.load(Ordering::Acquire) != 0)
    }
}

fn div_round_up(num: usize, den: usize) -> usize {
    (num + den - 1) / den.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_stripes_across_nodelets() {
        let bm = Bitmap::new(20, 4);
        bm.set_bit(5);
        assert!(bm.test(5));
        assert!(!bm.test(6));
        assert_eq!(bm.dump(), vec![5]);
    }

    #[test]
    fn clear_resets_all_bits() {
        let bm = Bitmap::new(100, 8);
        for i in (0..100).step_by(7) {
            bm.set_bit(i);
        }
        assert!(bm.any_set());
        bm.clear();
        assert!(!bm.any_set());
        assert!(bm.dump().is_empty());
    }

    #[test]
    fn dump_matches_set_bits() {
        let bm = Bitmap::new(50, 3);
        let expected: Vec<usize> = vec![0, 3, 17, 49];
        for &i in &expected {
            bm.set_bit(i);
        }
        assert_eq!(bm.dump(), expected);
    }
}
