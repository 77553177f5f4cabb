use std::sync::Arc;

use super::hook::FormatSet;
use super::module::{DamageModule, CLASS_NAME, DEVICE_NAME};
use crate::Core::error::Result;
use crate::Host::chrdev::DeviceRegistry;
use crate::Host::fb::FbRegistry;

/// Load-time parameters of the damage module.
#[derive(Clone, Debug)]
pub struct DamageBuilder {
    fbnode: usize,
    formats: FormatSet,
    device_name: String,
    class_name: String,
}

impl Default for DamageBuilder {
    fn default() -> Self {
        Self {
            fbnode: 0, // /dev/fb0, the EPDC on every supported board
            formats: FormatSet::ALL,
            device_name: DEVICE_NAME.to_owned(),
            class_name: CLASS_NAME.to_owned(),
        }
    }
}

impl DamageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the framebuffer whose ioctl handler gets hooked.
    pub fn with_fbnode(mut self, fbnode: usize) -> Self {
        self.fbnode = fbnode;
        self
    }

    pub fn with_formats(mut self, formats: FormatSet) -> Self {
        self.formats = formats;
        self
    }

    /// Name of the `/dev` node.
    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_owned();
        self
    }

    pub fn with_class_name(mut self, class: &str) -> Self {
        self.class_name = class.to_owned();
        self
    }

    pub fn fbnode(&self) -> usize {
        self.fbnode
    }

    pub fn formats(&self) -> FormatSet {
        self.formats
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Hook `fb<fbnode>` in `fbs` and publish the endpoint through `registry`.
    pub fn load(self, fbs: &FbRegistry, registry: Arc<dyn DeviceRegistry>) -> Result<DamageModule> {
        DamageModule::load(self, fbs, registry)
    }
}
