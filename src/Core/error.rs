use std::io;
use thiserror::Error;

/// Errors surfaced to readers of the damage endpoint and to whoever loads the module.
///
/// Every variant maps onto the errno a C consumer of the character device would see,
/// see [`DamageError::errno`].
#[derive(Debug, Error)]
pub enum DamageError {
    /// The requested framebuffer instance is not registered.
    #[error("no framebuffer registered at fb{fbnode}")]
    NoDevice { fbnode: usize },

    /// The endpoint already has a reader, or the module is still in use.
    #[error("device or resource busy")]
    Busy,

    /// The caller's read buffer cannot hold a single record.
    #[error("read buffer of {len} bytes is smaller than one damage record ({need} bytes)")]
    InvalidArgument { len: usize, need: usize },

    /// Nothing queued and the file was opened non-blocking.
    #[error("no damage record available")]
    WouldBlock,

    /// A blocking wait was interrupted before a record arrived.
    #[error("interrupted while waiting for damage records")]
    Interrupted,

    /// Copying from or to caller memory failed.
    #[error("bad address: {0}")]
    Fault(&'static str),

    /// Failure reported by an external collaborator (device registry, host driver).
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DamageError>;

impl DamageError {
    /// The errno value userspace observes for this error.
    pub fn errno(&self) -> i32 {
        match self {
            DamageError::NoDevice { .. } => libc::ENODEV,
            DamageError::Busy => libc::EBUSY,
            DamageError::InvalidArgument { .. } => libc::EINVAL,
            DamageError::WouldBlock => libc::EAGAIN,
            DamageError::Interrupted => libc::EINTR,
            DamageError::Fault(_) => libc::EFAULT,
            DamageError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Kernel-style return value for a failed file operation (`-errno`).
    pub fn as_neg_errno(&self) -> isize {
        -(self.errno() as isize)
    }
}

impl From<DamageError> for io::Error {
    fn from(e: DamageError) -> Self {
        match e {
            DamageError::Io(inner) => inner,
            other => io::Error::from_raw_os_error(other.errno()),
        }
    }
}
