// Load and unload of the damage module.
//
// Load order: look up the framebuffer, reserve a device number, build the channel, swap the
// hook in, publish the node. A failing step undoes the ones before it. Unload runs the
// reverse, restoring the driver's own handler last so no update is ever routed into a
// channel that is being torn down.

use std::sync::Arc;

use log::{debug, info, warn};

use super::builder::DamageBuilder;
use super::channel::DamageChannel;
use super::device::DamageDevice;
use super::hook::{DamageHook, FormatSet};
use crate::Core::error::{DamageError, Result};
use crate::Host::chrdev::{DevT, DeviceRegistry};
use crate::Host::fb::{FbInfo, FbRegistry, IoctlHandler};

pub const DEVICE_NAME: &str = "fbdamage";
pub const CLASS_NAME: &str = "fbdamage";
/// Name the device number is reserved under.
pub const REGION_NAME: &str = "mxc_epdc_fb_damage";

/// A loaded damage module: the hook is live and `/dev/<device_name>` is published.
pub struct DamageModule {
    config: DamageBuilder,
    fb: Arc<FbInfo>,
    orig: Arc<dyn IoctlHandler>,
    hook: Arc<DamageHook>,
    registry: Arc<dyn DeviceRegistry>,
    dev: DevT,
    device: Arc<DamageDevice>,
    loaded: bool,
}

impl DamageModule {
    pub(crate) fn load(
        config: DamageBuilder,
        fbs: &FbRegistry,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Result<Self> {
        let fbnode = config.fbnode();
        let fb = fbs.get(fbnode).ok_or_else(|| {
            warn!("fb{fbnode} is not registered");
            DamageError::NoDevice { fbnode }
        })?;

        let dev = registry.alloc_region(REGION_NAME).map_err(|e| {
            warn!("could not allocate a device number: {e}");
            DamageError::from(e)
        })?;

        let channel = DamageChannel::new();
        let Some((producer, consumer)) = channel.split() else {
            registry.release_region(dev);
            return Err(DamageError::Busy);
        };
        let device = DamageDevice::new(consumer);

        let formats = config.formats();
        let (orig, hook) =
            fb.swap_ioctl(|orig| Arc::new(DamageHook::new(orig, producer, formats)));
        debug!("hooked fb{fbnode} ({})", fb.name());

        if let Err(e) = registry.create_node(
            config.class_name(),
            config.device_name(),
            dev,
            Arc::clone(&device),
        ) {
            warn!("could not create /dev/{}: {e}, rolling back", config.device_name());
            fb.replace_ioctl(Arc::clone(&orig));
            registry.release_region(dev);
            return Err(e.into());
        }

        info!(
            "fbdamage loaded on fb{fbnode}: /dev/{} ({dev:?})",
            config.device_name()
        );
        Ok(Self {
            config,
            fb,
            orig,
            hook,
            registry,
            dev,
            device,
            loaded: true,
        })
    }

    /// Tear the module down. Refuses with [`DamageError::Busy`] while a reader holds the
    /// endpoint open; calling it again after success is a no-op.
    pub fn unload(&mut self) -> Result<()> {
        if !self.loaded {
            return Ok(());
        }
        if self.device.is_open() {
            return Err(DamageError::Busy);
        }
        self.teardown();
        Ok(())
    }

    fn teardown(&mut self) {
        self.registry
            .destroy_node(self.config.class_name(), self.dev);
        self.registry.release_region(self.dev);

        if !self.fb.is_handler(&self.hook) {
            warn!(
                "fb{} ioctl handler was replaced behind our back, restoring anyway",
                self.config.fbnode()
            );
        }
        self.fb.replace_ioctl(Arc::clone(&self.orig));
        self.loaded = false;
        info!("fbdamage unloaded from fb{}", self.config.fbnode());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn device(&self) -> &Arc<DamageDevice> {
        &self.device
    }

    pub fn channel(&self) -> &Arc<DamageChannel> {
        self.device.channel()
    }

    pub fn dev(&self) -> DevT {
        self.dev
    }

    pub fn fbnode(&self) -> usize {
        self.config.fbnode()
    }

    pub fn device_name(&self) -> &str {
        self.config.device_name()
    }

    pub fn formats(&self) -> FormatSet {
        self.config.formats()
    }

    /// The driver's own handler, as saved at load.
    pub fn original_handler(&self) -> &Arc<dyn IoctlHandler> {
        &self.orig
    }

    pub fn hook(&self) -> &Arc<DamageHook> {
        &self.hook
    }
}

impl Drop for DamageModule {
    fn drop(&mut self) {
        if self.loaded {
            if self.device.is_open() {
                warn!("fbdamage dropped with a reader attached, forcing teardown");
            }
            self.teardown();
        }
    }
}
