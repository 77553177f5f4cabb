pub mod builder;
pub mod channel;
pub mod consumer;
mod debug;
pub mod device;
pub mod hook;
pub mod module;
pub mod overflow;
pub mod producer;

pub use builder::DamageBuilder;
pub use channel::DamageChannel;
pub use consumer::DamageConsumer;
pub use device::{DamageDevice, DamageFile, Interrupter, OpenFlags, PollTable, POLL_READABLE};
pub use hook::{DamageHook, FormatSet};
pub use module::{DamageModule, CLASS_NAME, DEVICE_NAME, REGION_NAME};
pub use overflow::OverflowCounter;
pub use producer::DamageProducer;

pub mod Buffer;

pub mod Structs;
pub use Structs::{DamageFormat, DamageUpdate, UpdateCommand, RECORD_SIZE};
