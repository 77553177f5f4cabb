use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::consumer::DamageConsumer;
use super::overflow::OverflowCounter;
use super::producer::DamageProducer;
use crate::Core::wait_queue::WaitQueue;
use crate::Damage::Buffer::DamageRing;

/// Everything the hook and the endpoint share: the ring, the drop counter and the wait queue.
///
/// Owned jointly (through `Arc`) by the hook, the device and any open reader; freed when the
/// last of them goes away.
pub struct DamageChannel {
    pub(crate) ring: DamageRing,
    pub(crate) overflows: OverflowCounter,
    pub(crate) queue: WaitQueue,
    split: AtomicBool,
}

impl DamageChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ring: DamageRing::new(),
            overflows: OverflowCounter::new(),
            queue: WaitQueue::new(),
            split: AtomicBool::new(false),
        })
    }

    /// Hand out the one producer and the one consumer of this channel.
    ///
    /// Returns `None` on every call after the first.
    pub fn split(self: &Arc<Self>) -> Option<(DamageProducer, DamageConsumer)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((
            DamageProducer::new(Arc::clone(self)),
            DamageConsumer::new(Arc::clone(self)),
        ))
    }

    pub fn ring(&self) -> &DamageRing {
        &self.ring
    }

    pub fn overflows(&self) -> &OverflowCounter {
        &self.overflows
    }

    pub fn queue(&self) -> &WaitQueue {
        &self.queue
    }
}
