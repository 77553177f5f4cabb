// The /dev/fbdamage endpoint: a single-reader character device handing out one
// DamageUpdate per read. `open` claims the reader slot; dropping the DamageFile is `release`.
// Reads either fail fast (O_NONBLOCK) or sleep on the channel's wait queue until the hook
// publishes a record or the caller is interrupted.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;

use super::channel::DamageChannel;
use super::consumer::DamageConsumer;
use crate::Core::error::{DamageError, Result};
use crate::Core::wait_queue::WaitToken;
use crate::Damage::Structs::Update_Structs::{DamageUpdate, RECORD_SIZE};
use crate::Host::uaccess::UserPtr;

/// `poll` mask reported while at least one record is queued.
pub const POLL_READABLE: i16 = libc::POLLIN | libc::POLLRDNORM;

/// File status flags relevant to the endpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenFlags {
    nonblock: bool,
}

impl OpenFlags {
    pub const BLOCKING: OpenFlags = OpenFlags { nonblock: false };
    pub const NONBLOCK: OpenFlags = OpenFlags { nonblock: true };

    /// From `open(2)` flag bits; only `O_NONBLOCK` is looked at.
    pub fn from_bits(bits: i32) -> Self {
        Self {
            nonblock: bits & libc::O_NONBLOCK != 0,
        }
    }

    pub fn is_nonblocking(self) -> bool {
        self.nonblock
    }
}

/// The character device itself. At most one [`DamageFile`] exists for it at a time.
pub struct DamageDevice {
    channel: Arc<DamageChannel>,
    consumer: Mutex<DamageConsumer>,
    open: AtomicBool,
}

impl DamageDevice {
    pub fn new(consumer: DamageConsumer) -> Arc<Self> {
        Arc::new(Self {
            channel: Arc::clone(consumer.channel()),
            consumer: Mutex::new(consumer),
            open: AtomicBool::new(false),
        })
    }

    /// Claim the reader slot. Fails with [`DamageError::Busy`] while another file is open.
    pub fn open(self: &Arc<Self>, flags: OpenFlags) -> Result<DamageFile> {
        if self
            .open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DamageError::Busy);
        }
        debug!("fbdamage opened (nonblock={})", flags.is_nonblocking());
        Ok(DamageFile {
            device: Arc::clone(self),
            nonblocking: flags.is_nonblocking(),
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn channel(&self) -> &Arc<DamageChannel> {
        &self.channel
    }

    /// Records waiting to be read.
    pub fn pending(&self) -> usize {
        self.channel.ring.len()
    }
}

/// An open handle on [`DamageDevice`].
pub struct DamageFile {
    device: Arc<DamageDevice>,
    nonblocking: bool,
    interrupt: Arc<AtomicBool>,
}

impl DamageFile {
    /// `read(2)` into `buf`. Returns `RECORD_SIZE` on success.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = buf.len();
        self.read_user(&mut UserPtr::new(buf), count)
    }

    /// `read(2)` against caller memory that may not be fully accessible.
    ///
    /// `count` is the length the caller claims; `buf` is what is actually mapped. A copy
    /// fault leaves the record at the head of the queue.
    pub fn read_user(&mut self, buf: &mut UserPtr<'_>, count: usize) -> Result<usize> {
        if count < RECORD_SIZE {
            return Err(DamageError::InvalidArgument {
                len: count,
                need: RECORD_SIZE,
            });
        }

        loop {
            self.wait_nonempty()?;

            let overflows = &self.device.channel.overflows;
            let mut consumer = self.device.consumer.lock();
            let taken = consumer.take_with(|record| {
                // Added, not assigned: a record kept back by a fault keeps its earlier count.
                record.overflow_notify = record.overflow_notify.saturating_add(overflows.take());
                buf.copy_to_user(&record.to_bytes())
            });
            match taken {
                Some(Ok(())) => {
                    self.interrupt.store(false, Ordering::Release);
                    return Ok(RECORD_SIZE);
                }
                Some(Err(e)) => return Err(e),
                None => continue,
            }
        }
    }

    /// Read one record and hand it back decoded.
    pub fn read_record(&mut self) -> Result<DamageUpdate> {
        let mut buf = [0u8; RECORD_SIZE];
        self.read(&mut buf)?;
        DamageUpdate::from_bytes(&buf).ok_or(DamageError::Fault("malformed damage record"))
    }

    /// `poll(2)` file operation: register with `table` (if any) and report readiness.
    /// Never sleeps.
    pub fn poll(&self, table: Option<&mut PollTable>) -> i16 {
        if let Some(table) = table {
            table.poll_wait(&self.device.channel);
        }
        if self.device.channel.ring.is_empty() {
            0
        } else {
            POLL_READABLE
        }
    }

    /// Sleep until a record is queued or `timeout` passes (`None` waits forever).
    ///
    /// `Ok(false)` on timeout, [`DamageError::Interrupted`] if an [`Interrupter`] fired.
    /// A timeout too large to represent waits forever.
    pub fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let ready = self.wait_readable_until(deadline)?;
        // An interrupt only cancels the call it lands in.
        self.interrupt.store(false, Ordering::Release);
        Ok(ready)
    }

    fn wait_readable_until(&self, deadline: Option<Instant>) -> Result<bool> {
        let queue = &self.device.channel.queue;
        loop {
            let token = queue.prepare();
            if !self.device.channel.ring.is_empty() {
                return Ok(true);
            }
            if self.interrupt.swap(false, Ordering::AcqRel) {
                return Err(DamageError::Interrupted);
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            match queue.wait(token, remaining) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Err(DamageError::Interrupted)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// A handle that can break this file out of a blocking wait from another thread.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            pending: Arc::clone(&self.interrupt),
            channel: Arc::clone(&self.device.channel),
        }
    }

    pub fn device(&self) -> &Arc<DamageDevice> {
        &self.device
    }

    fn wait_nonempty(&mut self) -> Result<()> {
        let queue = &self.device.channel.queue;
        loop {
            let token = queue.prepare();
            if !self.device.channel.ring.is_empty() {
                return Ok(());
            }
            if self.nonblocking {
                return Err(DamageError::WouldBlock);
            }
            if self.interrupt.swap(false, Ordering::AcqRel) {
                return Err(DamageError::Interrupted);
            }
            match queue.wait(token, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Err(DamageError::Interrupted)
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for DamageFile {
    fn drop(&mut self) {
        self.device.open.store(false, Ordering::Release);
        debug!("fbdamage released");
    }
}

/// Stand-in for signal delivery to a reader sleeping in `read` or `wait_readable`.
#[derive(Clone)]
pub struct Interrupter {
    pending: Arc<AtomicBool>,
    channel: Arc<DamageChannel>,
}

impl Interrupter {
    /// Make the reader's current blocking wait return `Interrupted`. Fired between calls, it
    /// cancels the next call unless that one completes without sleeping.
    pub fn interrupt(&self) {
        self.pending.store(true, Ordering::Release);
        self.channel.queue.notify();
    }
}

/// The wait-queue registration half of `poll(2)`.
#[derive(Default)]
pub struct PollTable {
    entry: Option<(Arc<DamageChannel>, WaitToken)>,
}

impl PollTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `poll_wait`: remember the channel and where its sequence stood.
    pub fn poll_wait(&mut self, channel: &Arc<DamageChannel>) {
        self.entry = Some((Arc::clone(channel), channel.queue.prepare()));
    }

    pub fn is_registered(&self) -> bool {
        self.entry.is_some()
    }

    /// Sleep until the registered channel is notified after registration, or `timeout`.
    ///
    /// Returns `Ok(true)` when woken, `Ok(false)` on timeout. A table nothing registered with
    /// returns `Ok(false)` right away.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let Some((channel, token)) = self.entry.take() else {
            return Ok(false);
        };
        match channel.queue.wait(token, timeout) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(channel.queue.notified_since(token)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(DamageError::Interrupted),
            Err(e) => Err(e.into()),
        }
    }
}
