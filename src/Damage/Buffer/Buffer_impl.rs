use std::cell::UnsafeCell;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use super::layout::{RingIndices, DMG_BUF_SIZE};
use super::Buffer::DamageRing;
use crate::Damage::Structs::Update_Structs::DamageUpdate;

/// `CIRC_CNT`: occupied slots between `tail` and `head`.
#[inline]
pub const fn circ_cnt(head: usize, tail: usize, size: usize) -> usize {
    head.wrapping_sub(tail) & (size - 1)
}

/// `CIRC_SPACE`: free slots, always keeping one empty.
#[inline]
pub const fn circ_space(head: usize, tail: usize, size: usize) -> usize {
    circ_cnt(tail, head.wrapping_add(1), size)
}

impl Default for DamageRing {
    fn default() -> Self {
        Self::new()
    }
}

impl DamageRing {
    /// Allocate the ring. This is the only allocation the damage path ever makes.
    pub fn new() -> Self {
        let slots: Vec<UnsafeCell<DamageUpdate>> = (0..DMG_BUF_SIZE)
            .map(|_| UnsafeCell::new(DamageUpdate::default()))
            .collect();
        Self {
            indices: RingIndices::new(),
            slots: slots.into_boxed_slice(),
            mask: DMG_BUF_SIZE - 1,
        }
    }

    /// Number of slots, including the one that always stays empty.
    #[inline]
    pub fn capacity(&self) -> usize {
        DMG_BUF_SIZE
    }

    /// Records currently queued. A snapshot; either side may move right after.
    pub fn len(&self) -> usize {
        let head = self.indices.head.load(Acquire);
        let tail = self.indices.tail.load(Acquire);
        circ_cnt(head, tail, DMG_BUF_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == DMG_BUF_SIZE - 1
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut DamageUpdate {
        self.slots[index & self.mask].get()
    }

    /// Append `record` if a slot is free.
    ///
    /// # Safety
    /// Only one thread may act as producer on a given ring.
    pub(crate) unsafe fn push(&self, record: &DamageUpdate) -> bool {
        let head = self.indices.head.load(Relaxed);
        // Pairs with the consumer's Release store: the slot is free only once its copy-out is done.
        let tail = self.indices.tail.load(Acquire);

        if circ_space(head, tail, DMG_BUF_SIZE) == 0 {
            return false;
        }

        // SAFETY: slot `head` is outside [tail, head) so the consumer does not touch it.
        unsafe {
            self.slot(head).write(*record);
        }

        // Publish: a consumer that observes the new head also observes the slot contents.
        self.indices.head.store((head + 1) & self.mask, Release);
        true
    }

    /// Lend the oldest record to `f`; advance `tail` only when `f` succeeds.
    ///
    /// Returns `None` when the ring is empty.
    ///
    /// # Safety
    /// Only one thread may act as consumer on a given ring.
    pub(crate) unsafe fn take_with<R, E, F>(&self, f: F) -> Option<Result<R, E>>
    where
        F: FnOnce(&mut DamageUpdate) -> Result<R, E>,
    {
        // Read index before reading contents at that index.
        let head = self.indices.head.load(Acquire);
        let tail = self.indices.tail.load(Relaxed);

        if circ_cnt(head, tail, DMG_BUF_SIZE) == 0 {
            return None;
        }

        // SAFETY: slot `tail` was published by the producer and is not reused until we move on.
        let record = unsafe { &mut *self.slot(tail) };
        let result = f(record);

        if result.is_ok() {
            // Finish reading the slot before handing it back to the producer.
            self.indices.tail.store((tail + 1) & self.mask, Release);
        }
        Some(result)
    }
}
