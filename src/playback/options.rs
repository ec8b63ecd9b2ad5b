//! Pacing options for [`play`](crate::playback::play).

use std::time::Duration;
use crate::core::format::Format;
use crate::core::time::increments_per_second;
use crate::playback::play::PlayError;

/// Default duration of audio copied per tick
pub const DEFAULT_COPY_INCREMENT: Duration = Duration::from_millis(125);

/// Default number of increments kept between the write and read cursors
pub const DEFAULT_CHASE_INCREMENTS: u32 = 2;

/// Fewer than two increments of margin lets the write cursor catch the
/// device's read cursor.
pub const MIN_CHASE_INCREMENTS: u32 = 2;

/// How `play` paces copies from a reader into a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOptions {
    /// Audio time moved per tick; also the tick period
    pub copy_increment: Duration,
    /// Increments written up front before ticking starts
    pub chase_increments: u32,
    /// Skip the reader/writer format equality check
    pub allow_mismatched_formats: bool,
    /// On natural end, wait for the audio already handed to the writer to
    /// play out before resetting it
    pub drain_on_end: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            copy_increment: DEFAULT_COPY_INCREMENT,
            chase_increments: DEFAULT_CHASE_INCREMENTS,
            allow_mismatched_formats: false,
            drain_on_end: false,
        }
    }
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_copy_increment(mut self, copy_increment: Duration) -> Self {
        self.copy_increment = copy_increment;
        self
    }

    pub fn with_chase_increments(mut self, chase_increments: u32) -> Self {
        self.chase_increments = chase_increments;
        self
    }

    pub fn with_allow_mismatched_formats(mut self, allow: bool) -> Self {
        self.allow_mismatched_formats = allow;
        self
    }

    pub fn with_drain_on_end(mut self, drain: bool) -> Self {
        self.drain_on_end = drain;
        self
    }

    pub fn validate(&self) -> Result<(), PlayError> {
        if self.chase_increments < MIN_CHASE_INCREMENTS {
            return Err(PlayError::InvalidOptions(format!(
                "chase increments must be at least {}, got {}",
                MIN_CHASE_INCREMENTS, self.chase_increments
            )));
        }
        if self.copy_increment.is_zero() {
            return Err(PlayError::InvalidOptions(
                "copy increment must be non-zero".to_string(),
            ));
        }
        if self.copy_increment > Duration::from_secs(1) {
            return Err(PlayError::InvalidOptions(format!(
                "copy increment must be at most 1s, got {:?}",
                self.copy_increment
            )));
        }
        Ok(())
    }

    /// Bytes of `format` covering one copy increment:
    /// `bytes_per_second / (1s / copy_increment)`.
    ///
    /// Not rounded to whole frames: every tick must move exactly this much or
    /// the margin ahead of the device drifts. Readers and writers downstream
    /// carry split samples across calls.
    pub fn chunk_size(&self, format: &Format) -> Result<usize, PlayError> {
        let increments = increments_per_second(self.copy_increment);
        if increments == 0 {
            return Err(PlayError::InvalidOptions(format!(
                "copy increment {:?} does not divide a second",
                self.copy_increment
            )));
        }
        let chunk = (format.bytes_per_second() / increments) as usize;
        if chunk == 0 {
            return Err(PlayError::InvalidOptions(format!(
                "copy increment {:?} moves no bytes of {}",
                self.copy_increment, format
            )));
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PlayOptions::default();
        assert_eq!(options.copy_increment, Duration::from_millis(125));
        assert_eq!(options.chase_increments, 2);
        assert!(!options.allow_mismatched_formats);
        assert!(!options.drain_on_end);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_chase_increments_floor() {
        let options = PlayOptions::new().with_chase_increments(1);
        assert!(matches!(options.validate(), Err(PlayError::InvalidOptions(_))));
        assert!(PlayOptions::new().with_chase_increments(3).validate().is_ok());
    }

    #[test]
    fn test_copy_increment_bounds() {
        let zero = PlayOptions::new().with_copy_increment(Duration::ZERO);
        assert!(zero.validate().is_err());
        let long = PlayOptions::new().with_copy_increment(Duration::from_millis(1500));
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_chunk_size() {
        let options = PlayOptions::default();
        // 176400 / 8, even though 22050 is not a whole number of frames
        assert_eq!(options.chunk_size(&Format::new(44100, 2, 16)).unwrap(), 22050);
        assert_eq!(options.chunk_size(&Format::new(48000, 2, 16)).unwrap(), 24000);
        assert_eq!(options.chunk_size(&Format::new(8000, 1, 8)).unwrap(), 1000);
    }

    #[test]
    fn test_chunk_size_keeps_byte_rate() {
        // Over one second of ticks the writer must receive exactly one
        // second of audio, or the chase margin shrinks tick by tick.
        for increment_ms in [100, 125, 200, 250, 500] {
            let options = PlayOptions::new().with_copy_increment(Duration::from_millis(increment_ms));
            for format in [
                Format::new(44100, 2, 16),
                Format::new(48000, 2, 16),
                Format::new(48000, 6, 32),
                Format::new(8000, 1, 8),
            ] {
                let chunk = options.chunk_size(&format).unwrap() as u64;
                let ticks = 1000 / increment_ms;
                assert_eq!(chunk * ticks, format.bytes_per_second(), "{} at {}ms", format, increment_ms);
            }
        }
    }

    #[test]
    fn test_chunk_size_too_small() {
        let options = PlayOptions::new().with_copy_increment(Duration::from_micros(10));
        assert!(options.chunk_size(&Format::new(8000, 1, 8)).is_err());
    }
}
