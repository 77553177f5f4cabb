// Blocking reader: sleeps in read() until the synthetic driver sends an update.
// Ctrl+C interrupts the read and the demo unloads cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fbdamage::Damage::Structs::Legacy_Structs::{MxcfbUpdateDataV2, UpdateCommand};
use fbdamage::Damage::Structs::MxcfbRect;
use fbdamage::Host::{FbInfo, FbRegistry, IoctlHandler, NodeTable, UserPtr};
use fbdamage::{DamageBuilder, DamageError, FormatSet, OpenFlags};

struct EpdcDriver;

impl IoctlHandler for EpdcDriver {
    fn ioctl(&self, _cmd: u32, _arg: &mut UserPtr<'_>) -> i32 {
        0
    }
}

fn main() -> std::io::Result<()> {
    let fbs = FbRegistry::new();
    let fb = Arc::new(FbInfo::new("mxc_epdc_fb", Arc::new(EpdcDriver)));
    fbs.register(Arc::clone(&fb))?;

    let nodes = Arc::new(NodeTable::new());
    let mut module = DamageBuilder::new()
        .with_formats(FormatSet::V2_ONLY)
        .load(&fbs, nodes.clone())?;
    println!("Blocking reader: loaded {:?}", module);

    let mut file = nodes.open("fbdamage", OpenFlags::BLOCKING)?;

    let interrupter = file.interrupter();
    ctrlc::set_handler(move || interrupter.interrupt()).expect("Error setting Ctrl+C handler");

    let running = Arc::new(AtomicBool::new(true));
    let running_for_driver = Arc::clone(&running);
    let driver = thread::spawn(move || {
        let mut marker = 0;
        while running_for_driver.load(Ordering::Acquire) {
            let upd = MxcfbUpdateDataV2 {
                update_region: MxcfbRect {
                    top: 0,
                    left: 0,
                    width: 1072,
                    height: 1448,
                },
                waveform_mode: 2,
                update_marker: marker,
                ..Default::default()
            };
            fb.ioctl(UpdateCommand::V2.cmd(), &mut UserPtr::new(&mut upd.to_bytes()));
            marker += 1;
            thread::sleep(Duration::from_millis(500));
        }
    });

    println!("Blocking reader: waiting for damage (Ctrl+C to stop)...");
    loop {
        match file.read_record() {
            Ok(rec) => println!(
                "marker={} format={:?} region={:?} overflow_notify={}",
                rec.data.update_marker, rec.format, rec.data.update_region, rec.overflow_notify
            ),
            Err(DamageError::Interrupted) => {
                println!("Blocking reader: interrupted");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    running.store(false, Ordering::Release);
    driver.join().expect("driver thread panicked");
    drop(file);
    module.unload()?;
    Ok(())
}
