pub mod clock;
pub mod error;
pub mod futex;
pub mod wait_queue;

pub use error::{DamageError, Result};
pub use wait_queue::{WaitQueue, WaitToken};
