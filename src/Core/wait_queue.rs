// Wait/notify channel shared by the producer hook and the damage endpoint.
//
// A 32-bit sequence word is bumped on every `WaitQueue::notify`. Waiters take a
// `WaitToken` (a snapshot of the word) *before* re-checking their condition and then
// sleep on that snapshot, so a notify landing between the check and the sleep makes the
// futex return immediately instead of being lost.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::Core::futex::{futex_wait, futex_wake_all};

/// Sequence snapshot taken before checking a wait condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitToken(u32);

#[derive(Default)]
pub struct WaitQueue {
    seq: AtomicU32,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
        }
    }

    /// Register interest. Must be called before evaluating the condition being waited on.
    #[inline]
    pub fn prepare(&self) -> WaitToken {
        WaitToken(self.seq.load(Ordering::SeqCst))
    }

    /// Wake every waiter. Never blocks and never allocates, so it is safe on the producer path.
    #[inline]
    pub fn notify(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        futex_wake_all(&self.seq);
    }

    /// Sleep until a notify newer than `token`, a timeout or a signal.
    ///
    /// Returning `Ok(())` says nothing about the caller's condition: wakes may be spurious
    /// and the caller is expected to loop.
    pub fn wait(&self, token: WaitToken, timeout: Option<Duration>) -> io::Result<()> {
        futex_wait(&self.seq, token.0, timeout)
    }

    /// True once at least one notify happened after `token` was taken.
    #[inline]
    pub fn notified_since(&self, token: WaitToken) -> bool {
        self.seq.load(Ordering::SeqCst) != token.0
    }
}
