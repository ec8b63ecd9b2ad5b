//! Push-based PCM sinks and the factory that opens them.

use crate::core::format::{Format, FormatError};

/// Error type for audio sinks
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("unsupported output format {format}: {reason}")]
    UnsupportedFormat { format: Format, reason: String },
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("writer is closed")]
    Closed,
    #[error("cpal supported configs error: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("cpal build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("cpal play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

impl WriterError {
    pub(crate) fn unsupported(format: Format, reason: impl Into<String>) -> Self {
        WriterError::UnsupportedFormat {
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_format(format: Format, err: FormatError) -> Self {
        WriterError::unsupported(format, err.to_string())
    }
}

/// An output sink that owns its device for its whole lifetime.
pub trait Writer {
    /// Format the sink was opened with
    fn format(&self) -> Format;

    /// Hand `buf` to the sink, blocking until all of it has been accepted.
    /// Returns the number of bytes written (always `buf.len()` on success).
    fn write_pcm(&mut self, buf: &[u8]) -> Result<usize, WriterError>;

    /// Drop buffered audio that has not been played yet; the device keeps
    /// running.
    fn reset(&mut self) -> Result<(), WriterError>;

    /// Release the device. Further writes fail with [`WriterError::Closed`].
    fn close(&mut self) -> Result<(), WriterError>;
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn format(&self) -> Format {
        (**self).format()
    }

    fn write_pcm(&mut self, buf: &[u8]) -> Result<usize, WriterError> {
        (**self).write_pcm(buf)
    }

    fn reset(&mut self) -> Result<(), WriterError> {
        (**self).reset()
    }

    fn close(&mut self) -> Result<(), WriterError> {
        (**self).close()
    }
}

/// Opens writers for a platform. Chosen once at startup and passed to
/// whatever needs to play audio.
pub trait WriterFactory: Send + Sync {
    fn open(&self, format: Format) -> Result<Box<dyn Writer + Send>, WriterError>;
}
