// Fixed ring of canonical damage records, one producer (the ioctl hook) and one consumer
// (the /dev/fbdamage reader).

use super::layout::RingIndices;
use crate::Damage::Structs::Update_Structs::DamageUpdate;

use std::cell::UnsafeCell;

pub use super::layout::DMG_BUF_SIZE;

/// Single-producer/single-consumer circular array of [`DamageUpdate`]s.
///
/// ### Concurrency Design:
/// - **Producer**: owns `head`. Reads `tail` with `Acquire` to compute free space, fills slot
///   `head`, then publishes `head + 1` with `Release`.
/// - **Consumer**: owns `tail`. Reads `head` with `Acquire`, copies slot `tail` out, then
///   publishes `tail + 1` with `Release` so the producer only reuses the slot afterwards.
/// - One slot always stays empty: `head == tail` means empty, `head + 1 == tail` means full.
///
/// There is no lock around the slots; the index partition is the only synchronisation. The
/// raw operations are therefore `unsafe` and reached through [`crate::Damage::DamageProducer`]
/// and [`crate::Damage::DamageConsumer`], of which exactly one each exists per ring.
pub struct DamageRing {
    pub(crate) indices: RingIndices,

    /// Pre-allocated storage, `DMG_BUF_SIZE` slots.
    pub(crate) slots: Box<[UnsafeCell<DamageUpdate>]>,

    /// `DMG_BUF_SIZE - 1`, wraps indices.
    pub(crate) mask: usize,
}

// SAFETY: slot access is partitioned between one producer and one consumer by the
// acquire/release protocol on `indices`.
unsafe impl Send for DamageRing {}
unsafe impl Sync for DamageRing {}
