use std::sync::atomic::{AtomicU32, Ordering};

/// Drops since the reader last collected them.
///
/// The producer bumps it (saturating) whenever the ring is full; the reader swaps it back to
/// zero right before returning a record and stamps the old value into that record. The count
/// therefore attaches to whichever record happens to be read next, not to the updates that were
/// actually lost.
#[derive(Debug, Default)]
pub struct OverflowCounter {
    count: AtomicU32,
}

impl OverflowCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Producer side: one more record dropped.
    #[inline]
    pub fn record_drop(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| Some(n.saturating_add(1)));
    }

    /// Consumer side: read and reset in one exchange, so a racing drop is never lost.
    #[inline]
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Drops not yet reported to a reader.
    pub fn pending(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}
