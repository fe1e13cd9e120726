use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Range, RangeInclusive};
use std::sync::atomic::Ordering;

use atoi::FromRadix10;
use atomic::Atomic;

/// A vertex/edge index type usable across the engine.
///
/// Mirrors the builder crate's index abstraction one layer down, so that the
/// partitioned-memory primitives (striped arrays, intrinsics, bitmap) do not
/// need to depend on the graph construction crate.
pub trait Idx:
    Copy
    + std::ops::Add<Output = Self>
    + std::ops::AddAssign
    + std::ops::Sub<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Rem<Output = Self>
    + Ord
    + Debug
    + Send
    + Sum
    + Sync
    + Sized
    + 'static
{
    fn new(idx: usize) -> Self;

    fn zero() -> Self;

    fn index(self) -> usize;

    type RangeIter: Iterator<Item = Self>;

    fn range(self, end: Self) -> Self::RangeIter;

    type RangeInclusiveIter: Iterator<Item = Self>;

    fn range_inclusive(self, end: Self) -> Self::RangeInclusiveIter;

    fn parse(bytes: &[u8]) -> (Self, usize);

    fn get_and_increment(this: &Atomic<Self>, order: Ordering) -> Self {
        Self::fetch_add(this, Self::new(1), order)
    }

    fn fetch_add(this: &Atomic<Self>, val: Self, order: Ordering) -> Self;

    /// Remote-min: atomically store `val` if it is smaller than the current
    /// value, returning the previous value. Grounds the attach-to-min step of
    /// the label-propagation connected-components algorithm.
    fn fetch_min(this: &Atomic<Self>, val: Self, order: Ordering) -> Self {
        let mut current = this.load(order);
        while val < current {
            match this.compare_exchange_weak(current, val, order, order) {
                Ok(prev) => return prev,
                Err(prev) => current = prev,
            }
        }
        current
    }
}

macro_rules! impl_idx {
    ($TYPE:ty) => {
        impl Idx for $TYPE {
            #[inline]
            fn new(idx: usize) -> Self {
                assert!(idx <= <$TYPE>::MAX as usize);
                idx as $TYPE
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn index(self) -> usize {
                self as usize
            }

            type RangeIter = Range<Self>;

            #[inline]
            fn range(self, end: Self) -> Self::RangeIter {
                self..end
            }

            type RangeInclusiveIter = RangeInclusive<Self>;

            #[inline]
            fn range_inclusive(self, end: Self) -> Self::RangeInclusiveIter {
                self..=end
            }

            #[inline]
            fn parse(bytes: &[u8]) -> (Self, usize) {
                FromRadix10::from_radix_10(bytes)
            }

            #[inline]
            fn fetch_add(this: &Atomic<$TYPE>, val: $TYPE, order: Ordering) -> $TYPE {
                this.fetch_add(val, order)
            }
        }
    };
}

impl_idx!(u8);
impl_idx!(u16);
impl_idx!(u32);
impl_idx!(u64);
impl_idx!(usize);

impl_idx!(i8);
impl_idx!(i16);
impl_idx!(i32);
impl_idx!(i64);
impl_idx!(isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_min_keeps_smallest() {
        let a = Atomic::new(10u32);
        assert_eq!(u32::fetch_min(&a, 20, Ordering::SeqCst), 10);
        assert_eq!(a.load(Ordering::SeqCst), 10);
        assert_eq!(u32::fetch_min(&a, 3, Ordering::SeqCst), 10);
        assert_eq!(a.load(Ordering::SeqCst), 3);
    }
}
