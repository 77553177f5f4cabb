mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::Rig;
use fbdamage::Damage::{PollTable, POLL_READABLE};
use fbdamage::Host::UserPtr;
use fbdamage::{DamageError, OpenFlags, RECORD_SIZE};

#[test]
fn single_reader_at_a_time() {
    let rig = Rig::new();
    let module = rig.load();

    let file = rig.nodes.open("/dev/fbdamage", OpenFlags::BLOCKING).unwrap();
    assert!(module.device().is_open());
    let err = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap_err();
    assert!(matches!(err, DamageError::Busy));
    assert_eq!(err.errno(), libc::EBUSY);

    drop(file);
    assert!(!module.device().is_open());
    let _again = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
}

#[test]
fn open_missing_node() {
    let rig = Rig::new();
    let err = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap_err();
    assert!(matches!(err, DamageError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn short_buffer_is_rejected_without_consuming() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
    rig.send_v2(5);

    let mut small = vec![0u8; RECORD_SIZE - 1];
    let err = file.read(&mut small).unwrap_err();
    assert!(matches!(err, DamageError::InvalidArgument { len, need } if len == RECORD_SIZE - 1 && need == RECORD_SIZE));
    assert_eq!(err.errno(), libc::EINVAL);

    assert_eq!(file.read_record().unwrap().data.update_marker, 5);
}

#[test]
fn large_buffer_gets_exactly_one_record() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
    rig.send_v2(1);
    rig.send_v2(2);

    let mut buf = vec![0u8; RECORD_SIZE * 4];
    assert_eq!(file.read(&mut buf).unwrap(), RECORD_SIZE);
    assert!(buf[RECORD_SIZE..].iter().all(|&b| b == 0));
    assert_eq!(file.read_record().unwrap().data.update_marker, 2);
}

#[test]
fn nonblocking_empty_read_would_block() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::from_bits(libc::O_RDONLY | libc::O_NONBLOCK)).unwrap();
    assert!(file.is_nonblocking());

    let err = file.read_record().unwrap_err();
    assert!(matches!(err, DamageError::WouldBlock));
    assert_eq!(err.errno(), libc::EAGAIN);
}

#[test]
fn blocking_read_wakes_on_update() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::BLOCKING).unwrap();

    let fb = rig.fb.clone();
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let mut bytes = common::v2_update(77).to_bytes();
        fb.ioctl(
            fbdamage::Damage::UpdateCommand::V2.cmd(),
            &mut UserPtr::new(&mut bytes),
        );
    });

    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 77);
    sender.join().unwrap();
}

#[test]
fn interrupted_blocking_read_consumes_nothing() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::BLOCKING).unwrap();

    let interrupter = file.interrupter();
    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        interrupter.interrupt();
    });

    let err = file.read_record().unwrap_err();
    assert!(matches!(err, DamageError::Interrupted));
    assert_eq!(err.errno(), libc::EINTR);
    waker.join().unwrap();

    rig.send_v2(3);
    assert_eq!(module.device().pending(), 1);
    assert_eq!(file.read_record().unwrap().data.update_marker, 3);
}

#[test]
fn switching_to_nonblocking() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::BLOCKING).unwrap();
    file.set_nonblocking(true);
    assert!(matches!(file.read_record(), Err(DamageError::WouldBlock)));
}

#[test]
fn poll_reports_readiness() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    let mut table = PollTable::new();
    assert_eq!(file.poll(Some(&mut table)), 0);
    assert!(table.is_registered());

    rig.send_v2(1);
    assert_eq!(file.poll(None), POLL_READABLE);
    assert_eq!(POLL_READABLE, libc::POLLIN | libc::POLLRDNORM);
    // The notify landed after registration, so waiting returns at once.
    assert!(table.wait(Some(Duration::from_secs(5))).unwrap());

    file.read_record().unwrap();
    assert_eq!(file.poll(None), 0);
}

#[test]
fn poll_wait_sleeps_until_update() {
    let rig = Rig::new();
    let _module = rig.load();
    let file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    let mut table = PollTable::new();
    assert_eq!(file.poll(Some(&mut table)), 0);

    let fb = rig.fb.clone();
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let mut bytes = common::v2_update(1).to_bytes();
        fb.ioctl(
            fbdamage::Damage::UpdateCommand::V2.cmd(),
            &mut UserPtr::new(&mut bytes),
        );
    });

    let mut woken = false;
    let deadline = Instant::now() + Duration::from_secs(5);
    while !woken && Instant::now() < deadline {
        woken = table.wait(Some(Duration::from_millis(500))).unwrap();
        if !woken {
            file.poll(Some(&mut table));
        }
    }
    assert!(woken);
    assert_eq!(file.poll(None), POLL_READABLE);
    sender.join().unwrap();
}

#[test]
fn wait_readable_times_out() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    let start = Instant::now();
    assert!(!file.wait_readable(Some(Duration::from_millis(30))).unwrap());
    assert!(start.elapsed() >= Duration::from_millis(30));

    rig.send_v2(1);
    assert!(file.wait_readable(Some(Duration::from_millis(30))).unwrap());
}

#[test]
fn overflow_is_reported_on_next_read() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    for marker in 0..65 {
        rig.send_v2(marker);
    }
    assert_eq!(module.device().pending(), 63);
    assert_eq!(module.channel().overflows().pending(), 2);

    let first = file.read_record().unwrap();
    assert_eq!(first.data.update_marker, 0);
    assert_eq!(first.overflow_notify, 2);

    for marker in 1..63 {
        let rec = file.read_record().unwrap();
        assert_eq!(rec.data.update_marker, marker);
        assert_eq!(rec.overflow_notify, 0);
    }
    assert!(matches!(file.read_record(), Err(DamageError::WouldBlock)));
}

#[test]
fn faulting_read_keeps_record_and_overflow() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    for marker in 0..64 {
        rig.send_v2(marker);
    }

    let err = file.read_user(&mut UserPtr::null(), RECORD_SIZE).unwrap_err();
    assert!(matches!(err, DamageError::Fault(_)));
    assert_eq!(err.errno(), libc::EFAULT);
    assert_eq!(module.device().pending(), 63);

    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 0);
    assert_eq!(rec.overflow_notify, 1);
}

#[test]
fn reading_into_caller_memory() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
    rig.send_v2(8);

    let mut region = vec![0u8; RECORD_SIZE];
    let n = file
        .read_user(&mut UserPtr::new(&mut region), RECORD_SIZE)
        .unwrap();
    assert_eq!(n, RECORD_SIZE);
    let rec = fbdamage::DamageUpdate::from_bytes(&region).unwrap();
    assert_eq!(rec.data.update_marker, 8);
}

#[test]
fn huge_timeout_does_not_overflow() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();
    rig.send_v2(1);

    assert!(file.wait_readable(Some(Duration::MAX)).unwrap());
    assert_eq!(file.read_record().unwrap().data.update_marker, 1);
}

#[test]
fn interrupt_between_reads_does_not_cancel_later_read() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::BLOCKING).unwrap();

    rig.send_v2(1);
    file.interrupter().interrupt();
    assert_eq!(file.read_record().unwrap().data.update_marker, 1);

    let fb = rig.fb.clone();
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let mut bytes = common::v2_update(2).to_bytes();
        fb.ioctl(
            fbdamage::Damage::UpdateCommand::V2.cmd(),
            &mut UserPtr::new(&mut bytes),
        );
    });

    assert_eq!(file.read_record().unwrap().data.update_marker, 2);
    sender.join().unwrap();
}

#[test]
fn interrupt_cleared_by_completed_wait_readable() {
    let rig = Rig::new();
    let _module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    rig.send_v2(1);
    file.interrupter().interrupt();
    assert!(file.wait_readable(None).unwrap());
    file.read_record().unwrap();

    assert!(!file.wait_readable(Some(Duration::from_millis(20))).unwrap());
}

#[test]
fn blocking_read_survives_spurious_wakes() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::BLOCKING).unwrap();

    let channel = module.channel().clone();
    let fb = rig.fb.clone();
    let sender = thread::spawn(move || {
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(10));
            channel.queue().notify();
        }
        let mut bytes = common::v2_update(42).to_bytes();
        fb.ioctl(
            fbdamage::Damage::UpdateCommand::V2.cmd(),
            &mut UserPtr::new(&mut bytes),
        );
    });

    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 42);
    sender.join().unwrap();
    assert_eq!(module.device().pending(), 0);
}

#[test]
fn overflow_count_resets_between_reads() {
    let rig = Rig::new();
    let module = rig.load();
    let mut file = rig.nodes.open("fbdamage", OpenFlags::NONBLOCK).unwrap();

    // Fill the ring and drop 3.
    for marker in 0..66 {
        rig.send_v2(marker);
    }
    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 0);
    assert_eq!(rec.overflow_notify, 3);

    // One slot free: the first goes in, the next 4 are dropped.
    for marker in 100..105 {
        rig.send_v2(marker);
    }
    assert_eq!(module.channel().overflows().pending(), 4);

    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 1);
    assert_eq!(rec.overflow_notify, 4);

    let rec = file.read_record().unwrap();
    assert_eq!(rec.data.update_marker, 2);
    assert_eq!(rec.overflow_notify, 0);
}

#[test]
fn errors_as_negative_errno() {
    assert_eq!(DamageError::WouldBlock.as_neg_errno(), -(libc::EAGAIN as isize));
    assert_eq!(DamageError::Busy.as_neg_errno(), -(libc::EBUSY as isize));
    assert_eq!(
        DamageError::Fault("bad").as_neg_errno(),
        -(libc::EFAULT as isize)
    );
    assert!(UserPtr::null().is_null());
    assert!(!UserPtr::new(&mut [0u8; 4]).is_null());
}
