use std::sync::Arc;

use super::channel::DamageChannel;
use crate::Damage::Structs::Update_Structs::DamageUpdate;

/// The write side of a [`DamageChannel`]. Exactly one exists per channel.
///
/// Every operation is bounded: no blocking, no sleeping, no allocation. It is meant to run
/// inside the host driver's ioctl path with the host's lock held.
pub struct DamageProducer {
    channel: Arc<DamageChannel>,
}

impl DamageProducer {
    pub(crate) fn new(channel: Arc<DamageChannel>) -> Self {
        Self { channel }
    }

    /// Append a record if the ring has a free slot.
    ///
    /// Returns `false` when full; the caller decides whether that counts as a drop
    /// (see [`DamageProducer::record_drop`]).
    #[inline]
    pub fn try_append(&mut self, record: &DamageUpdate) -> bool {
        // SAFETY: `&mut self` on the only producer of this ring.
        unsafe { self.channel.ring.push(record) }
    }

    /// Account one dropped record.
    #[inline]
    pub fn record_drop(&self) {
        self.channel.overflows.record_drop();
    }

    /// Wake the reader and any pollers.
    #[inline]
    pub fn notify(&self) {
        self.channel.queue.notify();
    }

    pub fn channel(&self) -> &Arc<DamageChannel> {
        &self.channel
    }
}
