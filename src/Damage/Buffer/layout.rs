use crossbeam_utils::CachePadded;
use std::sync::atomic::AtomicUsize;

/// Number of slots in the damage ring. Matches `EPDC_V2_MAX_NUM_UPDATES`, the most updates the
/// EPDC driver itself keeps in flight. Must stay a power of two.
pub const DMG_BUF_SIZE: usize = 64;

const _: () = assert!(DMG_BUF_SIZE.is_power_of_two());

/// The two cursors of the damage ring, each written by exactly one side.
///
/// Padded so the producer's stores to `head` do not bounce the consumer's `tail` line.
#[repr(C)]
pub struct RingIndices {
    /// Next slot the producer writes. Written only by the producer, published with `Release`.
    pub head: CachePadded<AtomicUsize>,

    /// Next slot the consumer reads. Written only by the consumer, published with `Release`.
    pub tail: CachePadded<AtomicUsize>,
}

impl RingIndices {
    pub const fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for RingIndices {
    fn default() -> Self {
        Self::new()
    }
}
