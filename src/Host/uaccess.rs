use std::mem::size_of;
use std::ptr;

use crate::Core::error::{DamageError, Result};

/// Plain-old-data layouts that may be filled straight from caller bytes.
///
/// # Safety
/// Implementors must be `#[repr(C)]` structs built only from integer fields, so that every
/// bit pattern is a valid value.
pub unsafe trait UserCopy: Copy {}

/// A caller-supplied memory region, the `unsigned long arg` / `char __user *` of a file
/// operation.
///
/// A null pointer models an address that cannot be dereferenced at all; a region shorter than
/// the object being copied models a partially mapped one. Both fail with
/// [`DamageError::Fault`], exactly where `copy_from_user`/`copy_to_user` would.
pub struct UserPtr<'a> {
    region: Option<&'a mut [u8]>,
}

impl<'a> UserPtr<'a> {
    pub fn new(region: &'a mut [u8]) -> Self {
        Self {
            region: Some(region),
        }
    }

    pub fn null() -> Self {
        Self { region: None }
    }

    pub fn is_null(&self) -> bool {
        self.region.is_none()
    }

    /// Number of accessible bytes behind the pointer.
    pub fn len(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy a `T` out of caller memory.
    pub fn copy_from_user<T: UserCopy>(&self) -> Result<T> {
        let src = self
            .region
            .as_deref()
            .ok_or(DamageError::Fault("null user pointer"))?;
        if src.len() < size_of::<T>() {
            return Err(DamageError::Fault("user region shorter than requested object"));
        }
        // SAFETY: length checked above; `T: UserCopy` accepts any bit pattern.
        Ok(unsafe { ptr::read_unaligned(src.as_ptr() as *const T) })
    }

    /// Copy `bytes` into the start of caller memory.
    pub fn copy_to_user(&mut self, bytes: &[u8]) -> Result<()> {
        let dst = self
            .region
            .as_deref_mut()
            .ok_or(DamageError::Fault("null user pointer"))?;
        if dst.len() < bytes.len() {
            return Err(DamageError::Fault("user region shorter than copied object"));
        }
        dst[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
