//! Ack-control bracket around fire-and-forget remote writes.
//!
//! On the original machine, remote writes are asynchronous: the caller does
//! not wait for the write to land before continuing. Algorithms that need to
//! know "every remote write I issued in this region has completed" (for
//! example, before reading back a frontier bitmap that other threads were
//! just writing into) bracket the region with `disable_acks()` /
//! `reenable_acks()`, which forces every nodelet to drain outstanding writes
//! before the fence returns.
//!
//! Here every "remote write" is a synchronous atomic RMW, so nothing is ever
//! actually outstanding; the bracket is kept as a real, nestable guard so
//! that callers retain the same ordering discipline, backed by a real
//! `SeqCst` fence rather than becoming a silent no-op.

use std::sync::atomic::{fence, AtomicUsize, Ordering};

static DISABLE_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// RAII guard returned by [`disable_acks`]. Reenables acks and fences on drop.
pub struct AckRegion {
    _private: (),
}

impl Drop for AckRegion {
    fn drop(&mut self) {
        reenable_acks();
    }
}

/// Enter a region in which remote writes are considered in-flight until the
/// returned guard is dropped (or [`reenable_acks`] is called explicitly).
pub fn disable_acks() -> AckRegion {
    DISABLE_DEPTH.fetch_add(1, Ordering::AcqRel);
    log::debug!("ack-control: disabled (depth {})", DISABLE_DEPTH.load(Ordering::Acquire));
    AckRegion { _private: () }
}

/// Leave the region entered by the most recent [`disable_acks`] call and
/// fence so that every write issued inside it is visible to the caller.
pub fn reenable_acks() {
    let prev = DISABLE_DEPTH.fetch_sub(1, Ordering::AcqRel);
    debug_assert!(prev > 0, "reenable_acks called without a matching disable_acks");
    fence(Ordering::SeqCst);
    log::debug!("ack-control: reenabled (depth {})", prev.saturating_sub(1));
}

pub fn acks_disabled() -> bool {
    DISABLE_DEPTH.load(Ordering::Acquire) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_regions_track_depth() {
        assert!(!acks_disabled());
        let outer = disable_acks();
        assert!(acks_disabled());
        {
            let _inner = disable_acks();
            assert!(acks_disabled());
        }
        assert!(acks_disabled());
        drop(outer);
        assert!(!acks_disabled());
    }
}
