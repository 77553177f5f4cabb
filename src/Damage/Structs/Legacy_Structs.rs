// Caller-side layouts of the three SEND_UPDATE generations, as the EPDC driver's
// userspace API declares them, plus the ioctl numbers derived from them.

use std::mem::{offset_of, size_of};

use super::Update_Structs::{put_u32, put_usize, DamageFormat, MxcfbRect};
use crate::Host::uaccess::UserCopy;

/// `alt_buffer_data` of the oldest (NTX) API, which still carries a virtual address.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbAltBufferDataV1Ntx {
    pub virt_addr: usize,
    pub phys_addr: u32,
    pub width: u32,
    pub height: u32,
    pub alt_update_region: MxcfbRect,
}

/// `alt_buffer_data` of the V1 and V2 APIs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbAltBufferData {
    pub phys_addr: u32,
    pub width: u32,
    pub height: u32,
    pub alt_update_region: MxcfbRect,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbUpdateDataV1Ntx {
    pub update_region: MxcfbRect,
    pub waveform_mode: u32,
    pub update_mode: u32,
    pub update_marker: u32,
    pub temp: i32,
    pub flags: u32,
    pub alt_buffer_data: MxcfbAltBufferDataV1Ntx,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbUpdateDataV1 {
    pub update_region: MxcfbRect,
    pub waveform_mode: u32,
    pub update_mode: u32,
    pub update_marker: u32,
    pub temp: i32,
    pub flags: u32,
    pub alt_buffer_data: MxcfbAltBufferData,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbUpdateDataV2 {
    pub update_region: MxcfbRect,
    pub waveform_mode: u32,
    pub update_mode: u32,
    pub update_marker: u32,
    pub temp: i32,
    pub flags: u32,
    pub dither_mode: u32,
    pub quant_bit: u32,
    pub alt_buffer_data: MxcfbAltBufferData,
}

macro_rules! encode_update_header {
    ($ty:ty, $src:expr, $out:expr) => {{
        $src.update_region
            .encode(&mut $out[offset_of!($ty, update_region)..]);
        put_u32($out, offset_of!($ty, waveform_mode), $src.waveform_mode);
        put_u32($out, offset_of!($ty, update_mode), $src.update_mode);
        put_u32($out, offset_of!($ty, update_marker), $src.update_marker);
        put_u32($out, offset_of!($ty, temp), $src.temp as u32);
        put_u32($out, offset_of!($ty, flags), $src.flags);
    }};
}

impl MxcfbAltBufferDataV1Ntx {
    fn encode(&self, out: &mut [u8]) {
        put_usize(out, offset_of!(Self, virt_addr), self.virt_addr);
        put_u32(out, offset_of!(Self, phys_addr), self.phys_addr);
        put_u32(out, offset_of!(Self, width), self.width);
        put_u32(out, offset_of!(Self, height), self.height);
        self.alt_update_region
            .encode(&mut out[offset_of!(Self, alt_update_region)..]);
    }
}

impl MxcfbAltBufferData {
    fn encode(&self, out: &mut [u8]) {
        put_u32(out, offset_of!(Self, phys_addr), self.phys_addr);
        put_u32(out, offset_of!(Self, width), self.width);
        put_u32(out, offset_of!(Self, height), self.height);
        self.alt_update_region
            .encode(&mut out[offset_of!(Self, alt_update_region)..]);
    }
}

impl MxcfbUpdateDataV1Ntx {
    /// The argument image a client passes to `MXCFB_SEND_UPDATE_V1_NTX`, padding zeroed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; size_of::<Self>()];
        encode_update_header!(Self, self, &mut out[..]);
        self.alt_buffer_data
            .encode(&mut out[offset_of!(Self, alt_buffer_data)..]);
        out
    }
}

impl MxcfbUpdateDataV1 {
    /// The argument image a client passes to `MXCFB_SEND_UPDATE_V1`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; size_of::<Self>()];
        encode_update_header!(Self, self, &mut out[..]);
        self.alt_buffer_data
            .encode(&mut out[offset_of!(Self, alt_buffer_data)..]);
        out
    }
}

impl MxcfbUpdateDataV2 {
    /// The argument image a client passes to `MXCFB_SEND_UPDATE_V2`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; size_of::<Self>()];
        encode_update_header!(Self, self, &mut out[..]);
        put_u32(&mut out, offset_of!(Self, dither_mode), self.dither_mode);
        put_u32(&mut out, offset_of!(Self, quant_bit), self.quant_bit);
        self.alt_buffer_data
            .encode(&mut out[offset_of!(Self, alt_buffer_data)..]);
        out
    }
}

// SAFETY: #[repr(C)], integer fields only.
unsafe impl UserCopy for MxcfbUpdateDataV1Ntx {}
unsafe impl UserCopy for MxcfbUpdateDataV1 {}
unsafe impl UserCopy for MxcfbUpdateDataV2 {}

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_WRITE: u32 = 1;

/// `_IOW(ty, nr, size)` with the asm-generic encoding (ARM uses it too).
pub const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    (IOC_WRITE << IOC_DIRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

pub const MXCFB_SEND_UPDATE_V1_NTX: u32 = iow(b'F', 0x2E, size_of::<MxcfbUpdateDataV1Ntx>());
pub const MXCFB_SEND_UPDATE_V1: u32 = iow(b'F', 0x2E, size_of::<MxcfbUpdateDataV1>());
pub const MXCFB_SEND_UPDATE_V2: u32 = iow(b'F', 0x2E, size_of::<MxcfbUpdateDataV2>());

/// The send-update commands the hook knows how to decode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UpdateCommand {
    V1Ntx,
    V1,
    V2,
}

impl UpdateCommand {
    pub const ALL: [UpdateCommand; 3] = [UpdateCommand::V1Ntx, UpdateCommand::V1, UpdateCommand::V2];

    pub fn from_cmd(cmd: u32) -> Option<Self> {
        match cmd {
            MXCFB_SEND_UPDATE_V1_NTX => Some(Self::V1Ntx),
            MXCFB_SEND_UPDATE_V1 => Some(Self::V1),
            MXCFB_SEND_UPDATE_V2 => Some(Self::V2),
            _ => None,
        }
    }

    pub const fn cmd(self) -> u32 {
        match self {
            Self::V1Ntx => MXCFB_SEND_UPDATE_V1_NTX,
            Self::V1 => MXCFB_SEND_UPDATE_V1,
            Self::V2 => MXCFB_SEND_UPDATE_V2,
        }
    }

    pub const fn format(self) -> DamageFormat {
        match self {
            Self::V1Ntx => DamageFormat::V1Ntx,
            Self::V1 => DamageFormat::V1,
            Self::V2 => DamageFormat::V2,
        }
    }

    /// Size of the caller structure behind this command.
    pub const fn arg_size(self) -> usize {
        match self {
            Self::V1Ntx => size_of::<MxcfbUpdateDataV1Ntx>(),
            Self::V1 => size_of::<MxcfbUpdateDataV1>(),
            Self::V2 => size_of::<MxcfbUpdateDataV2>(),
        }
    }
}
