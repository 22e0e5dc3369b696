//! Minimum-floor resolution shared by the kernel-parameter tunables.

/// Documented minimums for SAP application hosts.
pub mod floors {
    /// Smallest shared memory segment size for SAP instances, in bytes
    /// (SAP note 941735).
    pub const SHMMAX: u64 = 21_474_836_480;
    /// Total shared memory covering SHMMAX, in 4 KiB pages.
    pub const SHMALL: u64 = 5_242_880;
    /// Memory map count for large SAP work processes (SAP note 900929).
    pub const MAX_MAP_COUNT: u64 = 2_000_000;
    /// Semaphore limits from SAP note 1771258, in kernel.sem field order.
    pub const SEMMSL: u64 = 1_250;
    pub const SEMMNS: u64 = 256_000;
    pub const SEMOPM: u64 = 100;
    pub const SEMMNI: u64 = 8_192;
}

/// Pick the value to apply for a floor-governed tunable.
///
/// The configured value wins when it meets the floor; otherwise the floor
/// wins when it raises the live value; otherwise the live value stands.
/// The result is never below `min(floor, current)`, so a floor-governed
/// tunable is never silently lowered past both bounds.
pub fn resolve(configured: Option<u64>, floor: Option<u64>, current: u64) -> u64 {
    match (configured, floor) {
        (Some(c), None) => c,
        (Some(c), Some(f)) if c >= f => c,
        (_, Some(f)) if f > current => f,
        _ => current,
    }
}
