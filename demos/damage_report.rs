// Reference consumer: a synthetic EPDC driver sends updates through the hooked fb0 while
// the main thread polls /dev/fbdamage and prints every record it drains.
//
//   cargo run --example damage_report -- [num_updates]

use std::env;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fbdamage::Damage::Structs::Legacy_Structs::{
    MxcfbAltBufferData, MxcfbAltBufferDataV1Ntx, MxcfbUpdateDataV1, MxcfbUpdateDataV1Ntx,
    MxcfbUpdateDataV2, UpdateCommand,
};
use fbdamage::Damage::Structs::MxcfbRect;
use fbdamage::Damage::{PollTable, POLL_READABLE};
use fbdamage::Host::{FbInfo, FbRegistry, IoctlHandler, NodeTable, UserPtr};
use fbdamage::{DamageBuilder, DamageError, DamageFormat, DamageUpdate, OpenFlags};

/// Stands in for mxc_epdc_fb's own ioctl: accepts every SEND_UPDATE.
struct EpdcDriver {
    updates: AtomicU32,
}

impl IoctlHandler for EpdcDriver {
    fn ioctl(&self, cmd: u32, _arg: &mut UserPtr<'_>) -> i32 {
        match UpdateCommand::from_cmd(cmd) {
            Some(_) => {
                self.updates.fetch_add(1, Ordering::Relaxed);
                0
            }
            None => -libc::ENOTTY,
        }
    }
}

fn random_update(marker: u32) -> (UpdateCommand, Vec<u8>) {
    let region = MxcfbRect {
        top: fastrand::u32(0..1448),
        left: fastrand::u32(0..1072),
        width: fastrand::u32(1..1072),
        height: fastrand::u32(1..1448),
    };
    match fastrand::u8(0..3) {
        0 => {
            let upd = MxcfbUpdateDataV1Ntx {
                update_region: region,
                waveform_mode: 2,
                update_mode: 0,
                update_marker: marker,
                temp: 0x1000,
                flags: 0,
                alt_buffer_data: MxcfbAltBufferDataV1Ntx {
                    virt_addr: 0xdead_0000,
                    ..Default::default()
                },
            };
            (UpdateCommand::V1Ntx, upd.to_bytes())
        }
        1 => {
            let upd = MxcfbUpdateDataV1 {
                update_region: region,
                waveform_mode: 1,
                update_mode: 1,
                update_marker: marker,
                temp: 0x1001,
                flags: 0,
                alt_buffer_data: MxcfbAltBufferData::default(),
            };
            (UpdateCommand::V1, upd.to_bytes())
        }
        _ => {
            let upd = MxcfbUpdateDataV2 {
                update_region: region,
                waveform_mode: 6,
                update_mode: 1,
                update_marker: marker,
                temp: 0x1000,
                flags: 0,
                dither_mode: 1,
                quant_bit: 7,
                alt_buffer_data: MxcfbAltBufferData::default(),
            };
            (UpdateCommand::V2, upd.to_bytes())
        }
    }
}

fn print_record(rec: &DamageUpdate) {
    let name = match rec.format {
        DamageFormat::V1Ntx => "MXCFB_SEND_UPDATE_V1_NTX",
        DamageFormat::V1 => "MXCFB_SEND_UPDATE_V1",
        DamageFormat::V2 => "MXCFB_SEND_UPDATE_V2",
        DamageFormat::Error => {
            println!("[{}] invalid update, overflow_notify={}", rec.timestamp, rec.overflow_notify);
            return;
        }
        DamageFormat::Unknown => "unknown",
    };
    let d = &rec.data;
    let r = &d.update_region;
    println!(
        "[{}] {}: overflow_notify={} {{update_region={{top={}, left={}, width={}, height={}}}, waveform_mode={}, update_mode={}, update_marker={}, temp={}, flags={}, dither_mode={}, quant_bit={}, alt_buffer_data={{virt_addr={:#x}, phys_addr={}}}}}",
        rec.timestamp,
        name,
        rec.overflow_notify,
        r.top,
        r.left,
        r.width,
        r.height,
        d.waveform_mode,
        d.update_mode,
        d.update_marker,
        d.temp,
        d.flags,
        d.dither_mode,
        d.quant_bit,
        d.alt_buffer_data.virt_addr,
        d.alt_buffer_data.phys_addr,
    );
}

fn main() -> std::io::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let num_updates: u32 = env::args()
        .nth(1)
        .map(|s| s.parse().expect("Invalid number of updates"))
        .unwrap_or(200);

    let driver = Arc::new(EpdcDriver {
        updates: AtomicU32::new(0),
    });
    let fbs = FbRegistry::new();
    let fb = Arc::new(FbInfo::new("mxc_epdc_fb", driver.clone()));
    fbs.register(Arc::clone(&fb))?;

    let nodes = Arc::new(NodeTable::new());
    let mut module = DamageBuilder::new().load(&fbs, nodes.clone())?;

    let mut file = nodes.open("/dev/fbdamage", OpenFlags::NONBLOCK)?;

    let done = Arc::new(AtomicBool::new(false));
    let done_for_driver = Arc::clone(&done);
    let sender = thread::spawn(move || {
        for marker in 0..num_updates {
            let (command, mut bytes) = random_update(marker);
            fb.ioctl(command.cmd(), &mut UserPtr::new(&mut bytes));
            thread::sleep(Duration::from_micros(fastrand::u64(100..5_000)));
        }
        done_for_driver.store(true, Ordering::Release);
    });

    let mut received = 0u32;
    let mut dropped = 0u32;
    loop {
        let mut table = PollTable::new();
        if file.poll(Some(&mut table)) & POLL_READABLE == 0 {
            if done.load(Ordering::Acquire) && file.poll(None) == 0 {
                break;
            }
            table.wait(Some(Duration::from_millis(100)))?;
            continue;
        }

        loop {
            match file.read_record() {
                Ok(rec) => {
                    received += 1;
                    dropped += rec.overflow_notify;
                    print_record(&rec);
                }
                Err(DamageError::WouldBlock) => break,
                Err(e) => return Err(e.into()),
            }
        }
    }

    sender.join().expect("driver thread panicked");
    drop(file);
    module.unload()?;

    println!(
        "driver saw {} updates, reader received {} records, {} reported dropped",
        driver.updates.load(Ordering::Relaxed),
        received,
        dropped
    );
    Ok(())
}
