//! Conversions between wall-clock time and PCM byte counts.
//! Byte counts are always derived from `Format::bytes_per_second()`.

use std::time::Duration;
use crate::core::format::Format;

/// Time constants for conversions
pub mod constants {
    pub const NANOS_PER_SECOND: u128 = 1_000_000_000;
    pub const MILLIS_PER_SECOND: u128 = 1_000;
}

/// Number of bytes that cover `duration` of audio in `format`.
///
/// Millisecond resolution: `bytes_per_second * duration_ms / 1000`.
#[inline]
pub fn bytes_for(format: &Format, duration: Duration) -> u64 {
    let bytes = format.bytes_per_second() as u128 * duration.as_millis()
        / constants::MILLIS_PER_SECOND;
    bytes.min(u64::MAX as u128) as u64
}

/// Playback time covered by `bytes` of audio in `format`.
///
/// Returns zero for a format with no throughput.
#[inline]
pub fn duration_of(format: &Format, bytes: u64) -> Duration {
    let bytes_per_second = format.bytes_per_second() as u128;
    if bytes_per_second == 0 {
        return Duration::ZERO;
    }
    let nanos = bytes as u128 * constants::NANOS_PER_SECOND / bytes_per_second;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}

/// How many whole `increment`s fit in one second (0 if the increment is
/// zero or longer than a second).
#[inline]
pub fn increments_per_second(increment: Duration) -> u64 {
    let nanos = increment.as_nanos();
    if nanos == 0 {
        return 0;
    }
    (constants::NANOS_PER_SECOND / nanos) as u64
}

/// Format a duration as HH:MM:SS.mmm
pub fn format_duration(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
