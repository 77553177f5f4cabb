// The canonical damage record handed to readers of /dev/fbdamage.

// no atomics here; plain integral types so the #[repr(C)] image is the wire format

use std::mem::{offset_of, size_of};

/// Which caller layout a record was decoded from.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DamageFormat {
    /// `MXCFB_SEND_UPDATE_V1_NTX`, the oldest Kobo layout (carries `virt_addr`).
    V1Ntx = 0,
    /// `MXCFB_SEND_UPDATE_V1`.
    V1 = 1,
    /// `MXCFB_SEND_UPDATE_V2` (adds `dither_mode` and `quant_bit`).
    V2 = 2,
    /// The caller's structure could not be copied.
    Error = 3,
    /// Not recognised as an update command. The hook never emits this; it exists so the tag
    /// space matches what readers decode.
    #[default]
    Unknown = 4,
}

impl DamageFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::V1Ntx),
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::Error),
            4 => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MxcfbRect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

/// `alt_buffer_data` in its richest form.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageAltBufferData {
    /// Only meaningful for `V1Ntx` callers, zero otherwise.
    pub virt_addr: usize,
    pub phys_addr: u32,
    pub width: u32,
    pub height: u32,
    pub alt_update_region: MxcfbRect,
}

/// Update parameters, superset of every supported caller layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageData {
    pub update_region: MxcfbRect,
    pub waveform_mode: u32,
    pub update_mode: u32,
    pub update_marker: u32,
    pub temp: i32,
    pub flags: u32,
    /// V2 only, zero otherwise.
    pub dither_mode: u32,
    /// V2 only, zero otherwise.
    pub quant_bit: u32,
    pub alt_buffer_data: DamageAltBufferData,
}

/// One intercepted `SEND_UPDATE` call.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageUpdate {
    /// `CLOCK_MONOTONIC` nanoseconds, taken before decoding.
    pub timestamp: i64,
    pub format: DamageFormat,
    /// Records dropped since the previous successful read. Stamped at read time.
    pub overflow_notify: u32,
    pub data: DamageData,
}

/// Size in bytes of one record on the wire; also the minimum read length.
pub const RECORD_SIZE: usize = size_of::<DamageUpdate>();

impl DamageUpdate {
    /// Record for a call whose argument could not be read.
    pub fn error(timestamp: i64) -> Self {
        Self {
            timestamp,
            format: DamageFormat::Error,
            overflow_notify: 0,
            data: DamageData::default(),
        }
    }

    /// The `#[repr(C)]` image of this record with padding zeroed, in native byte order.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        put_i64(&mut out, offset_of!(DamageUpdate, timestamp), self.timestamp);
        put_u32(&mut out, offset_of!(DamageUpdate, format), self.format as u32);
        put_u32(
            &mut out,
            offset_of!(DamageUpdate, overflow_notify),
            self.overflow_notify,
        );
        self.data
            .encode(&mut out[offset_of!(DamageUpdate, data)..]);
        out
    }

    /// Parse a record produced by [`DamageUpdate::to_bytes`]. `None` if `bytes` is short or the
    /// format tag is out of range.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_SIZE {
            return None;
        }
        let format = DamageFormat::from_raw(get_u32(bytes, offset_of!(DamageUpdate, format)))?;
        Some(Self {
            timestamp: get_i64(bytes, offset_of!(DamageUpdate, timestamp)),
            format,
            overflow_notify: get_u32(bytes, offset_of!(DamageUpdate, overflow_notify)),
            data: DamageData::decode(&bytes[offset_of!(DamageUpdate, data)..]),
        })
    }
}

impl DamageData {
    fn encode(&self, out: &mut [u8]) {
        self.update_region
            .encode(&mut out[offset_of!(DamageData, update_region)..]);
        put_u32(out, offset_of!(DamageData, waveform_mode), self.waveform_mode);
        put_u32(out, offset_of!(DamageData, update_mode), self.update_mode);
        put_u32(out, offset_of!(DamageData, update_marker), self.update_marker);
        put_u32(out, offset_of!(DamageData, temp), self.temp as u32);
        put_u32(out, offset_of!(DamageData, flags), self.flags);
        put_u32(out, offset_of!(DamageData, dither_mode), self.dither_mode);
        put_u32(out, offset_of!(DamageData, quant_bit), self.quant_bit);
        self.alt_buffer_data
            .encode(&mut out[offset_of!(DamageData, alt_buffer_data)..]);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            update_region: MxcfbRect::decode(&bytes[offset_of!(DamageData, update_region)..]),
            waveform_mode: get_u32(bytes, offset_of!(DamageData, waveform_mode)),
            update_mode: get_u32(bytes, offset_of!(DamageData, update_mode)),
            update_marker: get_u32(bytes, offset_of!(DamageData, update_marker)),
            temp: get_u32(bytes, offset_of!(DamageData, temp)) as i32,
            flags: get_u32(bytes, offset_of!(DamageData, flags)),
            dither_mode: get_u32(bytes, offset_of!(DamageData, dither_mode)),
            quant_bit: get_u32(bytes, offset_of!(DamageData, quant_bit)),
            alt_buffer_data: DamageAltBufferData::decode(
                &bytes[offset_of!(DamageData, alt_buffer_data)..],
            ),
        }
    }
}

impl DamageAltBufferData {
    fn encode(&self, out: &mut [u8]) {
        put_usize(out, offset_of!(DamageAltBufferData, virt_addr), self.virt_addr);
        put_u32(out, offset_of!(DamageAltBufferData, phys_addr), self.phys_addr);
        put_u32(out, offset_of!(DamageAltBufferData, width), self.width);
        put_u32(out, offset_of!(DamageAltBufferData, height), self.height);
        self.alt_update_region
            .encode(&mut out[offset_of!(DamageAltBufferData, alt_update_region)..]);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            virt_addr: get_usize(bytes, offset_of!(DamageAltBufferData, virt_addr)),
            phys_addr: get_u32(bytes, offset_of!(DamageAltBufferData, phys_addr)),
            width: get_u32(bytes, offset_of!(DamageAltBufferData, width)),
            height: get_u32(bytes, offset_of!(DamageAltBufferData, height)),
            alt_update_region: MxcfbRect::decode(
                &bytes[offset_of!(DamageAltBufferData, alt_update_region)..],
            ),
        }
    }
}

impl MxcfbRect {
    pub(crate) fn encode(&self, out: &mut [u8]) {
        put_u32(out, offset_of!(MxcfbRect, top), self.top);
        put_u32(out, offset_of!(MxcfbRect, left), self.left);
        put_u32(out, offset_of!(MxcfbRect, width), self.width);
        put_u32(out, offset_of!(MxcfbRect, height), self.height);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            top: get_u32(bytes, offset_of!(MxcfbRect, top)),
            left: get_u32(bytes, offset_of!(MxcfbRect, left)),
            width: get_u32(bytes, offset_of!(MxcfbRect, width)),
            height: get_u32(bytes, offset_of!(MxcfbRect, height)),
        }
    }
}

#[inline]
pub(crate) fn put_u32(out: &mut [u8], off: usize, v: u32) {
    out[off..off + 4].copy_from_slice(&v.to_ne_bytes());
}

#[inline]
pub(crate) fn put_i64(out: &mut [u8], off: usize, v: i64) {
    out[off..off + 8].copy_from_slice(&v.to_ne_bytes());
}

#[inline]
pub(crate) fn put_usize(out: &mut [u8], off: usize, v: usize) {
    out[off..off + size_of::<usize>()].copy_from_slice(&v.to_ne_bytes());
}

#[inline]
fn get_u32(bytes: &[u8], off: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[off..off + 4]);
    u32::from_ne_bytes(raw)
}

#[inline]
fn get_i64(bytes: &[u8], off: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[off..off + 8]);
    i64::from_ne_bytes(raw)
}

#[inline]
fn get_usize(bytes: &[u8], off: usize) -> usize {
    let mut raw = [0u8; size_of::<usize>()];
    raw.copy_from_slice(&bytes[off..off + size_of::<usize>()]);
    usize::from_ne_bytes(raw)
}
