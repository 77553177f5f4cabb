// Interfaces of the subsystems the damage module plugs into.
//
// The framebuffer core owns the EPDC driver's ioctl entry point and serialises calls to it;
// the character-device registry hands out device numbers and `/dev` nodes. Both come with
// in-memory implementations so the module can be loaded and exercised from userspace.

pub mod chrdev;
pub mod fb;
pub mod uaccess;

pub use chrdev::{DevT, DeviceRegistry, NodeTable};
pub use fb::{FbInfo, FbRegistry, IoctlHandler, FB_MAX};
pub use uaccess::{UserCopy, UserPtr};
