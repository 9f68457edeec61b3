use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Seconds from 1900-01-01T00:00:00Z to the Unix epoch
pub const EPOCH_DELTA: i64 = 2_208_988_800;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// 64-bit NTP timestamp: seconds since 1900 plus a 2^-32 fraction
///
/// Both halves are unsigned and wrap independently. No era disambiguation is
/// performed, so values are interpreted within era 0 (1900..2036).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NtpTimestamp {
    /// Whole seconds since 1900-01-01T00:00:00Z
    pub seconds: u32,
    /// Fraction of a second in units of 2^-32 s
    pub fraction: u32,
}

impl NtpTimestamp {
    /// Creates a timestamp from its raw fields
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp { seconds, fraction }
    }

    /// Sub-second part in nanoseconds
    pub fn subsec_nanos(&self) -> u32 {
        ((self.fraction as u64 * NANOS_PER_SEC) >> 32) as u32
    }

    /// Converts to an absolute UTC instant
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.seconds as i64 - EPOCH_DELTA;
        // Era 0 spans 1900..2036, well inside the i64 nanosecond range.
        Utc.timestamp_nanos(secs * NANOS_PER_SEC as i64 + self.subsec_nanos() as i64)
    }

    /// Converts a UTC instant to a timestamp, wrapping the seconds into 32 bits.
    /// A leap second (subsec nanos past one second) is pinned to the end of the
    /// preceding second.
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        let seconds = (time.timestamp() + EPOCH_DELTA) as u32;
        let nanos = (time.timestamp_subsec_nanos() as u64).min(NANOS_PER_SEC - 1);
        let fraction = (nanos << 32) / NANOS_PER_SEC;
        NtpTimestamp {
            seconds,
            fraction: fraction as u32,
        }
    }
}

impl From<u64> for NtpTimestamp {
    fn from(raw: u64) -> Self {
        NtpTimestamp {
            seconds: (raw >> 32) as u32,
            fraction: raw as u32,
        }
    }
}

impl From<NtpTimestamp> for u64 {
    fn from(ts: NtpTimestamp) -> Self {
        (ts.seconds as u64) << 32 | ts.fraction as u64
    }
}

/// Converts a 16.16 fixed-point short-format value (root delay, root dispersion)
pub fn short_format_to_duration(raw: u32) -> Duration {
    let secs = (raw >> 16) as u64;
    let nanos = ((raw & 0xffff) as u64 * NANOS_PER_SEC) >> 16;
    Duration::new(secs, nanos as u32)
}
