use std::sync::Arc;

use super::channel::DamageChannel;
use crate::Damage::Structs::Update_Structs::DamageUpdate;

/// The read side of a [`DamageChannel`]. Exactly one exists per channel.
pub struct DamageConsumer {
    channel: Arc<DamageChannel>,
}

impl DamageConsumer {
    pub(crate) fn new(channel: Arc<DamageChannel>) -> Self {
        Self { channel }
    }

    /// Remove and return the oldest record, if any.
    pub fn try_take(&mut self) -> Option<DamageUpdate> {
        self.take_with(|record| Ok::<_, ()>(*record))
            .and_then(Result::ok)
    }

    /// Lend the oldest record to `f`, consuming it only if `f` returns `Ok`.
    ///
    /// `f` may modify the slot in place (the reader stamps `overflow_notify` this way); an
    /// `Err` leaves the record, modifications included, at the head of the queue.
    pub fn take_with<R, E, F>(&mut self, f: F) -> Option<Result<R, E>>
    where
        F: FnOnce(&mut DamageUpdate) -> Result<R, E>,
    {
        // SAFETY: `&mut self` on the only consumer of this ring.
        unsafe { self.channel.ring.take_with(f) }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.ring.is_empty()
    }

    pub fn channel(&self) -> &Arc<DamageChannel> {
        &self.channel
    }
}
