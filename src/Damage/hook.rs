use std::sync::Arc;

use parking_lot::Mutex;

use super::channel::DamageChannel;
use super::producer::DamageProducer;
use crate::Core::clock::monotonic_ns;
use crate::Damage::Structs::Legacy_Structs::{
    MxcfbUpdateDataV1, MxcfbUpdateDataV1Ntx, MxcfbUpdateDataV2, UpdateCommand,
};
use crate::Damage::Structs::Update_Structs::{DamageAltBufferData, DamageData, DamageUpdate};
use crate::Host::fb::IoctlHandler;
use crate::Host::uaccess::UserPtr;

/// Which `SEND_UPDATE` layouts the hook records.
///
/// Devices that only ever speak V2 can be built with [`FormatSet::V2_ONLY`]; the other two
/// commands then pass through unobserved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FormatSet {
    pub v1_ntx: bool,
    pub v1: bool,
    pub v2: bool,
}

impl FormatSet {
    pub const ALL: FormatSet = FormatSet {
        v1_ntx: true,
        v1: true,
        v2: true,
    };

    pub const V2_ONLY: FormatSet = FormatSet {
        v1_ntx: false,
        v1: false,
        v2: true,
    };

    pub fn contains(&self, command: UpdateCommand) -> bool {
        match command {
            UpdateCommand::V1Ntx => self.v1_ntx,
            UpdateCommand::V1 => self.v1,
            UpdateCommand::V2 => self.v2,
        }
    }

    /// The ioctl command matched for a raw code, if it is one this set records.
    pub fn match_cmd(&self, cmd: u32) -> Option<UpdateCommand> {
        UpdateCommand::from_cmd(cmd).filter(|c| self.contains(*c))
    }
}

impl Default for FormatSet {
    fn default() -> Self {
        Self::ALL
    }
}

/// Decorator installed in place of the EPDC driver's ioctl handler.
///
/// Calls through to the original handler, then records a [`DamageUpdate`] for every
/// `SEND_UPDATE` it recognises, whatever the original returned.
pub struct DamageHook {
    orig: Arc<dyn IoctlHandler>,
    producer: Mutex<DamageProducer>,
    channel: Arc<DamageChannel>,
    formats: FormatSet,
}

impl DamageHook {
    pub fn new(orig: Arc<dyn IoctlHandler>, producer: DamageProducer, formats: FormatSet) -> Self {
        let channel = Arc::clone(producer.channel());
        Self {
            orig,
            producer: Mutex::new(producer),
            channel,
            formats,
        }
    }

    /// The handler this hook forwards to.
    pub fn original(&self) -> &Arc<dyn IoctlHandler> {
        &self.orig
    }

    pub fn channel(&self) -> &Arc<DamageChannel> {
        &self.channel
    }

    pub fn formats(&self) -> FormatSet {
        self.formats
    }

    fn record(&self, command: UpdateCommand, arg: &UserPtr<'_>) {
        let timestamp = monotonic_ns();
        let record = decode_update(command, arg, timestamp);

        // The fb_info lock already serialises us; never wait here.
        match self.producer.try_lock() {
            Some(mut producer) => {
                if !producer.try_append(&record) {
                    producer.record_drop();
                }
                producer.notify();
            }
            None => {
                self.channel.overflows.record_drop();
                self.channel.queue.notify();
            }
        }
    }
}

impl IoctlHandler for DamageHook {
    fn ioctl(&self, cmd: u32, arg: &mut UserPtr<'_>) -> i32 {
        let ret = self.orig.ioctl(cmd, arg);
        if let Some(command) = self.formats.match_cmd(cmd) {
            self.record(command, arg);
        }
        ret
    }
}

/// Decode the caller's structure behind `command` into a canonical record.
///
/// A region that cannot be read yields an `Error`-tagged record carrying only the
/// timestamp.
pub fn decode_update(command: UpdateCommand, arg: &UserPtr<'_>, timestamp: i64) -> DamageUpdate {
    let data = match command {
        UpdateCommand::V1Ntx => arg.copy_from_user::<MxcfbUpdateDataV1Ntx>().map(normalize_v1_ntx),
        UpdateCommand::V1 => arg.copy_from_user::<MxcfbUpdateDataV1>().map(normalize_v1),
        UpdateCommand::V2 => arg.copy_from_user::<MxcfbUpdateDataV2>().map(normalize_v2),
    };
    match data {
        Ok(data) => DamageUpdate {
            timestamp,
            format: command.format(),
            overflow_notify: 0,
            data,
        },
        Err(_) => DamageUpdate::error(timestamp),
    }
}

pub fn normalize_v1_ntx(src: MxcfbUpdateDataV1Ntx) -> DamageData {
    let alt = src.alt_buffer_data;
    DamageData {
        update_region: src.update_region,
        waveform_mode: src.waveform_mode,
        update_mode: src.update_mode,
        update_marker: src.update_marker,
        temp: src.temp,
        flags: src.flags,
        dither_mode: 0,
        quant_bit: 0,
        alt_buffer_data: DamageAltBufferData {
            virt_addr: alt.virt_addr,
            phys_addr: alt.phys_addr,
            width: alt.width,
            height: alt.height,
            alt_update_region: alt.alt_update_region,
        },
    }
}

pub fn normalize_v1(src: MxcfbUpdateDataV1) -> DamageData {
    let alt = src.alt_buffer_data;
    DamageData {
        update_region: src.update_region,
        waveform_mode: src.waveform_mode,
        update_mode: src.update_mode,
        update_marker: src.update_marker,
        temp: src.temp,
        flags: src.flags,
        dither_mode: 0,
        quant_bit: 0,
        alt_buffer_data: DamageAltBufferData {
            virt_addr: 0,
            phys_addr: alt.phys_addr,
            width: alt.width,
            height: alt.height,
            alt_update_region: alt.alt_update_region,
        },
    }
}

pub fn normalize_v2(src: MxcfbUpdateDataV2) -> DamageData {
    let alt = src.alt_buffer_data;
    DamageData {
        update_region: src.update_region,
        waveform_mode: src.waveform_mode,
        update_mode: src.update_mode,
        update_marker: src.update_marker,
        temp: src.temp,
        flags: src.flags,
        dither_mode: src.dither_mode,
        quant_bit: src.quant_bit,
        alt_buffer_data: DamageAltBufferData {
            virt_addr: 0,
            phys_addr: alt.phys_addr,
            width: alt.width,
            height: alt.height,
            alt_update_region: alt.alt_update_region,
        },
    }
}
