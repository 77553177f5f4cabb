use std::fmt;

use crate::Damage::Buffer::DamageRing;
use crate::Damage::{DamageChannel, DamageDevice, DamageFile, DamageHook, DamageModule};

/// Debug function for DamageRing
///
/// Shows occupancy only; slot contents belong to whichever side currently owns them and are
/// never read from here.
pub fn debug_damage_ring(ring: &DamageRing, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageRing")
        .field("len", &ring.len())
        .field("capacity", &ring.capacity())
        .field("slots", &format_args!("{:p}", ring.slots.as_ptr()))
        .finish()
}

/// Debug function for DamageChannel
pub fn debug_damage_channel(channel: &DamageChannel, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageChannel")
        .field("ring", channel.ring())
        .field("pending_overflows", &channel.overflows().pending())
        .finish_non_exhaustive()
}

/// Debug function for DamageHook
///
/// The wrapped driver handler is opaque; only its address is shown.
pub fn debug_damage_hook(hook: &DamageHook, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageHook")
        .field("orig", &format_args!("{:p}", std::sync::Arc::as_ptr(hook.original())))
        .field("formats", &hook.formats())
        .field("channel", hook.channel())
        .finish()
}

pub fn debug_damage_device(device: &DamageDevice, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageDevice")
        .field("open", &device.is_open())
        .field("pending", &device.pending())
        .finish_non_exhaustive()
}

pub fn debug_damage_file(file: &DamageFile, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageFile")
        .field("nonblocking", &file.is_nonblocking())
        .field("device", file.device())
        .finish_non_exhaustive()
}

/// Debug function for DamageModule
///
/// Shows:
/// - fb node and device number
/// - Node name and format set
/// - Whether the hook is still installed
pub fn debug_damage_module(module: &DamageModule, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DamageModule")
        .field("fbnode", &module.fbnode())
        .field("dev", &module.dev())
        .field("device_name", &module.device_name())
        .field("formats", &module.formats())
        .field("loaded", &module.is_loaded())
        .finish_non_exhaustive()
}
