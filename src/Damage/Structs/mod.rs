pub mod Legacy_Structs;
pub mod Update_Structs;

pub use Legacy_Structs::UpdateCommand;
pub use Update_Structs::{
    DamageAltBufferData, DamageData, DamageFormat, DamageUpdate, MxcfbRect, RECORD_SIZE,
}; // re-export for stable path
