//! Pull-based PCM byte sources.

use std::io;
use crate::core::format::Format;

/// Result of a single pull from a [`Reader`].
///
/// `len > 0` and `end_of_stream` may both be set: the final read of a
/// finite source hands back its last bytes together with the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadStatus {
    /// Bytes written into the caller's buffer
    pub len: usize,
    /// The source has nothing more to produce
    pub end_of_stream: bool,
}

impl ReadStatus {
    pub fn more(len: usize) -> Self {
        Self {
            len,
            end_of_stream: false,
        }
    }

    pub fn end(len: usize) -> Self {
        Self {
            len,
            end_of_stream: true,
        }
    }
}

/// A PCM byte source that carries its own format.
pub trait Reader {
    /// Format of the bytes this reader produces
    fn format(&self) -> Format;

    /// Fill `buf` with up to `buf.len()` bytes.
    ///
    /// May return fewer bytes than requested without signalling
    /// end-of-stream; use [`read_full`] when a whole buffer is needed.
    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn format(&self) -> Format {
        (**self).format()
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read_pcm(buf)
    }
}

impl<R: Reader + ?Sized> Reader for &mut R {
    fn format(&self) -> Format {
        (**self).format()
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read_pcm(buf)
    }
}

/// Pull from `reader` until `buf` is full or the stream ends.
///
/// Stops early on a zero-byte read that is not end-of-stream, so a source
/// that never makes progress (an empty loop) yields a short count instead of
/// spinning.
pub fn read_full<R: Reader + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<ReadStatus> {
    let mut filled = 0;
    while filled < buf.len() {
        let status = reader.read_pcm(&mut buf[filled..])?;
        filled += status.len;
        if status.end_of_stream {
            return Ok(ReadStatus::end(filled));
        }
        if status.len == 0 {
            break;
        }
    }
    Ok(ReadStatus::more(filled))
}
