/// Reads `CLOCK_MONOTONIC` in nanoseconds, the same clock `ktime_get()` reports.
#[cfg(unix)]
pub fn monotonic_ns() -> i64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // CLOCK_MONOTONIC cannot fail with a valid timespec pointer.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as i64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as i64)
}

#[cfg(not(unix))]
pub fn monotonic_ns() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    // Fallback: nanoseconds since first use.
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as i64
}
