//! PCM stream format description.
//!
//! A `Format` is a plain value: sample rate, channel count and sample width.
//! Every timing computation downstream (chunk sizing, fade spans, playback
//! position) is derived from `bytes_per_second()`.

use std::fmt;

/// Error type for format validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("channel count must be non-zero")]
    ZeroChannels,
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),
}

/// Supported sample widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    /// One signed byte per sample
    Eight,
    /// Little-endian `i16`
    Sixteen,
    /// Little-endian `i32`
    ThirtyTwo,
}

impl BitDepth {
    /// Map a raw bit count to a supported width
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            32 => Some(BitDepth::ThirtyTwo),
            _ => None,
        }
    }

    /// Bits per sample
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// Bytes per sample
    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

/// Sample rate, channel count and sample width of a PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    /// Samples per second, per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Sample width in bits (8, 16 or 32)
    pub bits: u16,
}

impl Format {
    pub const fn new(sample_rate: u32, channels: u16, bits: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits,
        }
    }

    /// `sample_rate * channels * bits / 8`
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * self.bits as u64 / 8
    }

    /// Width of one sample in bytes (0 for sub-byte widths)
    pub fn bytes_per_sample(&self) -> usize {
        self.bits as usize / 8
    }

    /// Width of one interleaved frame (one sample for every channel)
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// The supported width this format uses, if any
    pub fn bit_depth(&self) -> Option<BitDepth> {
        BitDepth::from_bits(self.bits)
    }

    /// Reject formats that would produce a zero divisor in frame math or
    /// that no sink can play.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.sample_rate == 0 {
            return Err(FormatError::ZeroSampleRate);
        }
        if self.channels == 0 {
            return Err(FormatError::ZeroChannels);
        }
        match self.bit_depth() {
            Some(_) => Ok(()),
            None => Err(FormatError::UnsupportedBitDepth(self.bits)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}bit",
            self.sample_rate, self.channels, self.bits
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_second() {
        assert_eq!(Format::new(44100, 2, 16).bytes_per_second(), 176_400);
        assert_eq!(Format::new(48000, 1, 8).bytes_per_second(), 48_000);
        assert_eq!(Format::new(22050, 2, 32).bytes_per_second(), 176_400);
    }

    #[test]
    fn test_bytes_per_second_matches_formula() {
        for &rate in &[8000u32, 11025, 44100, 96000] {
            for channels in 1u16..=6 {
                for &bits in &[8u16, 16, 32] {
                    let format = Format::new(rate, channels, bits);
                    let expected = rate as u64 * channels as u64 * bits as u64 / 8;
                    assert_eq!(format.bytes_per_second(), expected);
                }
            }
        }
    }

    #[test]
    fn test_frame_size() {
        let format = Format::new(44100, 2, 16);
        assert_eq!(format.bytes_per_sample(), 2);
        assert_eq!(format.bytes_per_frame(), 4);
    }

    #[test]
    fn test_validate() {
        assert!(Format::new(44100, 2, 16).validate().is_ok());
        assert_eq!(
            Format::new(0, 2, 16).validate(),
            Err(FormatError::ZeroSampleRate)
        );
        assert_eq!(
            Format::new(44100, 0, 16).validate(),
            Err(FormatError::ZeroChannels)
        );
        assert_eq!(
            Format::new(44100, 2, 24).validate(),
            Err(FormatError::UnsupportedBitDepth(24))
        );
    }

    #[test]
    fn test_bit_depth_dispatch() {
        assert_eq!(BitDepth::from_bits(8), Some(BitDepth::Eight));
        assert_eq!(BitDepth::from_bits(16), Some(BitDepth::Sixteen));
        assert_eq!(BitDepth::from_bits(32), Some(BitDepth::ThirtyTwo));
        assert_eq!(BitDepth::from_bits(12), None);
        assert_eq!(BitDepth::ThirtyTwo.bytes(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(Format::new(44100, 2, 16).to_string(), "44100Hz/2ch/16bit");
    }
}
