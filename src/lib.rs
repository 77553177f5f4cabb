// Module naming follows project convention (Core / Damage / Host / Debug)
#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
pub mod Damage;

#[allow(non_snake_case)]
pub mod Host;

#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub use Core::error::{DamageError, Result};
pub use Damage::{
    DamageBuilder, DamageDevice, DamageFile, DamageFormat, DamageModule, DamageUpdate, FormatSet,
    OpenFlags, RECORD_SIZE,
};
