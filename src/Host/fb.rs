use std::io;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::Host::uaccess::UserPtr;

/// Maximum number of framebuffer instances the registry tracks (`FB_MAX`).
pub const FB_MAX: usize = 32;

/// The `fb_ioctl` slot of a framebuffer's operations table.
///
/// The framebuffer core calls `ioctl` with the owning [`FbInfo`]'s lock held, so two calls into
/// the same handler never overlap.
pub trait IoctlHandler: Send + Sync {
    fn ioctl(&self, cmd: u32, arg: &mut UserPtr<'_>) -> i32;
}

/// One registered framebuffer: a name plus its swappable ioctl entry point.
pub struct FbInfo {
    name: String,
    /// Doubles as the `fb_info` lock: held for the whole ioctl call and for swaps.
    ops: Mutex<Arc<dyn IoctlHandler>>,
}

impl FbInfo {
    pub fn new(name: impl Into<String>, handler: Arc<dyn IoctlHandler>) -> Self {
        Self {
            name: name.into(),
            ops: Mutex::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch an ioctl the way the framebuffer core does: under the per-device lock.
    pub fn ioctl(&self, cmd: u32, arg: &mut UserPtr<'_>) -> i32 {
        let ops = self.ops.lock();
        ops.ioctl(cmd, arg)
    }

    /// Current handler.
    pub fn ioctl_handler(&self) -> Arc<dyn IoctlHandler> {
        Arc::clone(&self.ops.lock())
    }

    /// Replace the handler with whatever `wrap` builds from the current one. Returns the
    /// handler that was installed before together with the new one.
    ///
    /// The swap happens under the device lock, so it waits for an in-flight call to finish and
    /// no call ever observes a half-installed handler.
    pub fn swap_ioctl<H, F>(&self, wrap: F) -> (Arc<dyn IoctlHandler>, Arc<H>)
    where
        H: IoctlHandler + 'static,
        F: FnOnce(Arc<dyn IoctlHandler>) -> Arc<H>,
    {
        let mut ops = self.ops.lock();
        let previous = Arc::clone(&ops);
        let installed = wrap(Arc::clone(&previous));
        *ops = Arc::clone(&installed) as Arc<dyn IoctlHandler>;
        debug!("{}: fb_ioctl swapped", self.name);
        (previous, installed)
    }

    /// Install `handler`, returning the previous one.
    pub fn replace_ioctl(&self, handler: Arc<dyn IoctlHandler>) -> Arc<dyn IoctlHandler> {
        let previous = std::mem::replace(&mut *self.ops.lock(), handler);
        debug!("{}: fb_ioctl replaced", self.name);
        previous
    }

    /// Whether `handler` is the one currently installed.
    pub fn is_handler<H: IoctlHandler + ?Sized>(&self, handler: &Arc<H>) -> bool {
        same_handler(&*self.ops.lock(), handler)
    }
}

/// Identity comparison on the data pointer only; vtable pointers are not unique.
pub fn same_handler<A, B>(a: &Arc<A>, b: &Arc<B>) -> bool
where
    A: IoctlHandler + ?Sized,
    B: IoctlHandler + ?Sized,
{
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// The `registered_fb[]` table.
pub struct FbRegistry {
    slots: Mutex<Vec<Option<Arc<FbInfo>>>>,
}

impl Default for FbRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FbRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(vec![None; FB_MAX]),
        }
    }

    /// Register a framebuffer in the first free slot, returning its index (`fbN`).
    pub fn register(&self, info: Arc<FbInfo>) -> io::Result<usize> {
        let mut slots = self.slots.lock();
        let idx = slots.iter().position(Option::is_none).ok_or_else(|| {
            io::Error::new(io::ErrorKind::OutOfMemory, "all framebuffer slots in use")
        })?;
        info!("registered fb{idx}: {}", info.name());
        slots[idx] = Some(info);
        Ok(idx)
    }

    pub fn unregister(&self, idx: usize) -> Option<Arc<FbInfo>> {
        self.slots.lock().get_mut(idx).and_then(Option::take)
    }

    pub fn get(&self, idx: usize) -> Option<Arc<FbInfo>> {
        self.slots.lock().get(idx).cloned().flatten()
    }
}
