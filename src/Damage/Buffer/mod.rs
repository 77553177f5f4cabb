pub mod Buffer;
pub mod Buffer_impl;
pub mod layout;

pub use layout::DMG_BUF_SIZE;
pub use Buffer::DamageRing; // re-export for stable path
