//! Remote atomic read-modify-write operations.
//!
//! On the original machine these are single-instruction operations that fire
//! off to whichever nodelet owns the target address and return without
//! waiting for an acknowledgement (hence the ack-controller in [`crate::ack`]).
//! Here they execute synchronously as ordinary atomic RMWs; the ack-control
//! bracket around a batch of them is kept as a real API so callers that used
//! to rely on "no acks outstanding past this point" keep the same contract
//! (a memory fence), even though nothing is actually in flight.

use std::sync::atomic::Ordering;

use atomic::Atomic;
use atomic_float::AtomicF64;

use crate::index::Idx;

const ORDER: Ordering = Ordering::AcqRel;

pub fn remote_add<T: Idx>(addr: &Atomic<T>, val: T) -> T {
    T::fetch_add(addr, val, ORDER)
}

pub fn remote_add_f64(addr: &AtomicF64, val: f64) -> f64 {
    addr.fetch_add(val, ORDER)
}

pub fn remote_min<T: Idx>(addr: &Atomic<T>, val: T) -> T {
    T::fetch_min(addr, val, ORDER)
}

pub fn remote_max<T: Idx>(addr: &Atomic<T>, val: T) -> T {
    let mut current = addr.load(ORDER);
    while val > current {
        match addr.compare_exchange_weak(current, val, ORDER, ORDER) {
            Ok(prev) => return prev,
            Err(prev) => current = prev,
        }
    }
    current
}

pub fn atomic_cas<T: Idx>(addr: &Atomic<T>, expected: T, new: T) -> T {
    addr.compare_exchange(expected, new, ORDER, Ordering::Acquire).unwrap_or_else(|prev| prev)
}

/// Atomically fetch-add, but clamp the returned "claim" to at most `cap`,
/// matching the original's `atomic_addms` (add-then-min) used by the
/// work-list to hand out bounded grains of work from a shared cursor.
pub fn atomic_add_saturating(addr: &std::sync::atomic::AtomicUsize, grain: usize, cap: usize) -> Option<(usize, usize)> {
    let prev = addr.fetch_add(grain, ORDER);
    if prev >= cap {
        return None;
    }
    let end = (prev + grain).min(cap);
    Some((prev, end))
}

pub fn remote_or(addr: &std::sync::atomic::AtomicU64, mask: u64) -> u64 {
    addr.fetch_or(mask, ORDER)
}

pub fn remote_and(addr: &std::sync::atomic::AtomicU64, mask: u64) -> u64 {
    addr.fetch_and(mask, ORDER)
}

pub fn remote_xor(addr: &std::sync::atomic::AtomicU64, mask: u64) -> u64 {
    addr.fetch_xor(mask, ORDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn saturating_add_stops_at_cap() {
        let cursor = AtomicUsize::new(0);
        assert_eq!(atomic_add_saturating(&cursor, 3, 5), Some((0, 3)));
        assert_eq!(atomic_add_saturating(&cursor, 3, 5), Some((3, 5)));
        assert_eq!(atomic_add_saturating(&cursor, 3, 5), None);
    }

    #[test]
    fn remote_max_keeps_largest() {
        let a = Atomic::new(5i64);
        assert_eq!(remote_max(&a, 2), 5);
        assert_eq!(a.load(Ordering::SeqCst), 5);
        assert_eq!(remote_max(&a, 9), 5);
        assert_eq!(a.load(Ordering::SeqCst), 9);
    }
}
