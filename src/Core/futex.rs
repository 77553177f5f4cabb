use std::io;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Sleeps while `atomic` still holds `expected`.
///
/// Returns `Ok(())` when woken or when the value already changed, `TimedOut` when
/// `timeout` elapsed and `Interrupted` when a signal cut the wait short.
#[cfg(target_os = "linux")]
pub fn futex_wait(atomic: &AtomicU32, expected: u32, timeout: Option<Duration>) -> io::Result<()> {
    use std::ptr;
    use std::sync::atomic::Ordering;

    // Check condition first to avoid syscall if possible
    if atomic.load(Ordering::Acquire) != expected {
        return Ok(());
    }

    let ts = timeout.map(|t| libc::timespec {
        tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: t.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(ptr::null::<libc::timespec>(), |t| t as *const libc::timespec);

    let rc = unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            ts_ptr,
            ptr::null::<u32>(),
            0u32,
        )
    };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Value moved on between our load and the kernel's check.
        Some(libc::EAGAIN) => Ok(()),
        Some(libc::ETIMEDOUT) => Err(io::Error::from(io::ErrorKind::TimedOut)),
        Some(libc::EINTR) => Err(io::Error::from(io::ErrorKind::Interrupted)),
        _ => Err(err),
    }
}

/// Wakes every thread sleeping on `atomic`.
#[cfg(target_os = "linux")]
pub fn futex_wake_all(atomic: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            i32::MAX, // reader plus any pollers
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wait(atomic: &AtomicU32, expected: u32, timeout: Option<Duration>) -> io::Result<()> {
    use std::sync::atomic::Ordering;

    // Fallback for non-Linux: short sleeps until the word moves
    let deadline = timeout.map(|t| std::time::Instant::now() + t);
    while atomic.load(Ordering::Acquire) == expected {
        if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        std::thread::sleep(Duration::from_micros(200));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wake_all(_atomic: &AtomicU32) {
    // No-op on non-Linux
}
