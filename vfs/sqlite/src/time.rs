use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Julian day number of the Unix epoch.
pub const UNIX_EPOCH_JULIAN_DAY: f64 = 2440587.5;

/// Julian day for `now`, counted in whole seconds.
pub fn julian_day(now: SystemTime) -> f64 {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    secs as f64 / 86400.0 + UNIX_EPOCH_JULIAN_DAY
}

/// Sleep the whole seconds of `micros` first, then the remainder.
pub fn sleep_micros(micros: u64) {
    let secs = micros / 1_000_000;
    if secs > 0 {
        std::thread::sleep(Duration::from_secs(secs));
    }
    let rest = micros % 1_000_000;
    if rest > 0 {
        std::thread::sleep(Duration::from_micros(rest));
    }
}
