// Shared fixtures: a stand-in EPDC driver and a loaded module around it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use fbdamage::Damage::Structs::Legacy_Structs::{
    MxcfbAltBufferData, MxcfbAltBufferDataV1Ntx, MxcfbUpdateDataV1, MxcfbUpdateDataV1Ntx,
    MxcfbUpdateDataV2, UpdateCommand,
};
use fbdamage::Damage::Structs::MxcfbRect;
use fbdamage::Host::{FbInfo, FbRegistry, IoctlHandler, NodeTable, UserPtr};
use fbdamage::{DamageBuilder, DamageModule};

/// Counts calls and answers every ioctl with a configurable value.
pub struct FakeEpdc {
    pub calls: AtomicU32,
    pub last_cmd: AtomicU32,
    pub ret: AtomicI32,
}

impl FakeEpdc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            last_cmd: AtomicU32::new(0),
            ret: AtomicI32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IoctlHandler for FakeEpdc {
    fn ioctl(&self, cmd: u32, _arg: &mut UserPtr<'_>) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_cmd.store(cmd, Ordering::SeqCst);
        self.ret.load(Ordering::SeqCst)
    }
}

pub struct Rig {
    pub fbs: FbRegistry,
    pub fb: Arc<FbInfo>,
    pub driver: Arc<FakeEpdc>,
    pub nodes: Arc<NodeTable>,
}

impl Rig {
    pub fn new() -> Self {
        let driver = FakeEpdc::new();
        let fbs = FbRegistry::new();
        let fb = Arc::new(FbInfo::new("mxc_epdc_fb", driver.clone()));
        fbs.register(Arc::clone(&fb)).unwrap();
        Self {
            fbs,
            fb,
            driver,
            nodes: Arc::new(NodeTable::new()),
        }
    }

    pub fn load(&self) -> DamageModule {
        self.load_with(DamageBuilder::new())
    }

    pub fn load_with(&self, builder: DamageBuilder) -> DamageModule {
        builder.load(&self.fbs, self.nodes.clone()).unwrap()
    }

    /// Issue `cmd` with `bytes` as the caller's argument, like a client's `ioctl(2)`.
    pub fn send(&self, cmd: u32, bytes: &mut [u8]) -> i32 {
        self.fb.ioctl(cmd, &mut UserPtr::new(bytes))
    }

    pub fn send_v2(&self, marker: u32) -> i32 {
        self.send(UpdateCommand::V2.cmd(), &mut v2_update(marker).to_bytes())
    }
}

pub fn rect(top: u32, left: u32, width: u32, height: u32) -> MxcfbRect {
    MxcfbRect {
        top,
        left,
        width,
        height,
    }
}

pub fn v1_ntx_update(marker: u32) -> MxcfbUpdateDataV1Ntx {
    MxcfbUpdateDataV1Ntx {
        update_region: rect(10, 20, 300, 400),
        waveform_mode: 2,
        update_mode: 1,
        update_marker: marker,
        temp: -3,
        flags: 0x4,
        alt_buffer_data: MxcfbAltBufferDataV1Ntx {
            virt_addr: 0xdead_b000,
            phys_addr: 0x8000_0000,
            width: 1024,
            height: 768,
            alt_update_region: rect(1, 2, 3, 4),
        },
    }
}

pub fn v1_update(marker: u32) -> MxcfbUpdateDataV1 {
    MxcfbUpdateDataV1 {
        update_region: rect(0, 0, 1072, 1448),
        waveform_mode: 1,
        update_mode: 0,
        update_marker: marker,
        temp: 0x1000,
        flags: 0,
        alt_buffer_data: MxcfbAltBufferData {
            phys_addr: 0x9000_0000,
            width: 64,
            height: 32,
            alt_update_region: rect(5, 6, 7, 8),
        },
    }
}

pub fn v2_update(marker: u32) -> MxcfbUpdateDataV2 {
    MxcfbUpdateDataV2 {
        update_region: rect(100, 200, 50, 60),
        waveform_mode: 6,
        update_mode: 1,
        update_marker: marker,
        temp: 24,
        flags: 0x2,
        dither_mode: 3,
        quant_bit: 7,
        alt_buffer_data: MxcfbAltBufferData::default(),
    }
}
