mod common;

use std::sync::Arc;

use common::{v1_ntx_update, v1_update, v2_update, Rig};
use fbdamage::Damage::hook::{decode_update, normalize_v1, normalize_v1_ntx, normalize_v2};
use fbdamage::Damage::Structs::Legacy_Structs::UpdateCommand;
use fbdamage::Host::UserPtr;
use fbdamage::{DamageBuilder, DamageError, DamageFormat, FormatSet, OpenFlags};

#[test]
fn v1_ntx_keeps_virt_addr() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    let upd = v1_ntx_update(11);
    assert_eq!(rig.send(UpdateCommand::V1Ntx.cmd(), &mut upd.to_bytes()), 0);

    let rec = file.read_record().unwrap();
    assert_eq!(rec.format, DamageFormat::V1Ntx);
    assert_eq!(rec.data.update_region, upd.update_region);
    assert_eq!(rec.data.update_marker, 11);
    assert_eq!(rec.data.temp, -3);
    assert_eq!(rec.data.flags, 0x4);
    assert_eq!(rec.data.dither_mode, 0);
    assert_eq!(rec.data.quant_bit, 0);
    assert_eq!(rec.data.alt_buffer_data.virt_addr, 0xdead_b000);
    assert_eq!(rec.data.alt_buffer_data.phys_addr, 0x8000_0000);
    assert_eq!(
        rec.data.alt_buffer_data.alt_update_region,
        upd.alt_buffer_data.alt_update_region
    );
    assert_eq!(rec.overflow_notify, 0);
    assert!(rec.timestamp > 0);
}

#[test]
fn v1_zeroes_extended_fields() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    let upd = v1_update(12);
    rig.send(UpdateCommand::V1.cmd(), &mut upd.to_bytes());

    let rec = file.read_record().unwrap();
    assert_eq!(rec.format, DamageFormat::V1);
    assert_eq!(rec.data.waveform_mode, 1);
    assert_eq!(rec.data.update_marker, 12);
    assert_eq!(rec.data.alt_buffer_data.virt_addr, 0);
    assert_eq!(rec.data.alt_buffer_data.phys_addr, 0x9000_0000);
    assert_eq!(rec.data.alt_buffer_data.width, 64);
    assert_eq!(rec.data.dither_mode, 0);
    assert_eq!(rec.data.quant_bit, 0);
}

#[test]
fn v2_keeps_dither_and_quant() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    rig.send_v2(13);

    let rec = file.read_record().unwrap();
    assert_eq!(rec.format, DamageFormat::V2);
    assert_eq!(rec.data.update_marker, 13);
    assert_eq!(rec.data.dither_mode, 3);
    assert_eq!(rec.data.quant_bit, 7);
    assert_eq!(rec.data.alt_buffer_data.virt_addr, 0);
}

#[test]
fn original_handler_runs_first_and_its_result_is_returned() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    rig.driver
        .ret
        .store(-libc::EINVAL, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(rig.send_v2(1), -libc::EINVAL);
    assert_eq!(rig.driver.calls(), 1);

    // Recorded even though the driver rejected it.
    assert_eq!(file.read_record().unwrap().data.update_marker, 1);
}

#[test]
fn unrelated_commands_pass_through_unrecorded() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    rig.driver.ret.store(42, std::sync::atomic::Ordering::SeqCst);
    let mut arg = [0u8; 8];
    assert_eq!(rig.send(0x4004_4600, &mut arg), 42);
    assert_eq!(rig.fb.ioctl(0x4600, &mut UserPtr::null()), 42);

    assert_eq!(rig.driver.calls(), 2);
    assert_eq!(rig.driver.last_cmd.load(std::sync::atomic::Ordering::SeqCst), 0x4600);
    assert_eq!(module.device().pending(), 0);
    assert!(matches!(file.read_record(), Err(DamageError::WouldBlock)));
}

#[test]
fn unreadable_argument_becomes_error_record() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    assert_eq!(rig.fb.ioctl(UpdateCommand::V2.cmd(), &mut UserPtr::null()), 0);
    let mut short = [0xffu8; 12];
    rig.send(UpdateCommand::V1.cmd(), &mut short);

    for _ in 0..2 {
        let rec = file.read_record().unwrap();
        assert_eq!(rec.format, DamageFormat::Error);
        assert!(rec.timestamp > 0);
        assert_eq!(rec.data, Default::default());
    }
    assert_eq!(rig.driver.calls(), 2);
}

#[test]
fn v2_only_ignores_older_layouts() {
    let rig = Rig::new();
    let module = rig.load_with(DamageBuilder::new().with_formats(FormatSet::V2_ONLY));
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
    assert_eq!(module.formats(), FormatSet::V2_ONLY);

    rig.send(UpdateCommand::V1Ntx.cmd(), &mut v1_ntx_update(1).to_bytes());
    rig.send(UpdateCommand::V1.cmd(), &mut v1_update(2).to_bytes());
    rig.send_v2(3);

    assert_eq!(rig.driver.calls(), 3);
    let rec = file.read_record().unwrap();
    assert_eq!(rec.format, DamageFormat::V2);
    assert_eq!(rec.data.update_marker, 3);
    assert!(matches!(file.read_record(), Err(DamageError::WouldBlock)));
}

#[test]
fn records_arrive_in_call_order() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    for marker in 0..40 {
        match marker % 3 {
            0 => rig.send(UpdateCommand::V1Ntx.cmd(), &mut v1_ntx_update(marker).to_bytes()),
            1 => rig.send(UpdateCommand::V1.cmd(), &mut v1_update(marker).to_bytes()),
            _ => rig.send_v2(marker),
        };
    }

    let mut last_ts = 0;
    for marker in 0..40 {
        let rec = file.read_record().unwrap();
        assert_eq!(rec.data.update_marker, marker);
        assert!(rec.timestamp >= last_ts);
        last_ts = rec.timestamp;
    }
}

#[test]
fn decode_without_a_module() {
    let mut bytes = v2_update(9).to_bytes();
    let arg = UserPtr::new(&mut bytes);
    let rec = decode_update(UpdateCommand::V2, &arg, 1234);
    assert_eq!(rec.timestamp, 1234);
    assert_eq!(rec.format, DamageFormat::V2);
    assert_eq!(rec.data, normalize_v2(v2_update(9)));

    let rec = decode_update(UpdateCommand::V1Ntx, &UserPtr::null(), 99);
    assert_eq!(rec.format, DamageFormat::Error);
    assert_eq!(rec.timestamp, 99);

    assert_eq!(normalize_v1(v1_update(1)).alt_buffer_data.virt_addr, 0);
    assert_eq!(
        normalize_v1_ntx(v1_ntx_update(1)).alt_buffer_data.virt_addr,
        0xdead_b000
    );
}

#[test]
fn hook_wraps_the_registered_handler() {
    let rig = Rig::new();
    let module = rig.load();
    let orig: Arc<dyn fbdamage::Host::IoctlHandler> = rig.driver.clone();

    assert!(rig.fb.is_handler(module.hook()));
    assert!(fbdamage::Host::fb::same_handler(module.hook().original(), &orig));
    assert!(fbdamage::Host::fb::same_handler(module.original_handler(), &orig));
}
