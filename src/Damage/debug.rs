use std::fmt;

use super::Buffer::DamageRing;
use super::{DamageChannel, DamageDevice, DamageFile, DamageHook, DamageModule};

impl fmt::Debug for DamageRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_ring(self, f)
    }
}

impl fmt::Debug for DamageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_channel(self, f)
    }
}

impl fmt::Debug for DamageHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_hook(self, f)
    }
}

impl fmt::Debug for DamageDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_device(self, f)
    }
}

impl fmt::Debug for DamageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_file(self, f)
    }
}

impl fmt::Debug for DamageModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_damage_module(self, f)
    }
}
