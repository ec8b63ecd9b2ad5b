//! Record-then-replay looping decorator.

use std::io;
use crate::core::format::Format;
use crate::pcm::reader::{ReadStatus, Reader};

/// Plays the wrapped reader once while recording it, then replays the
/// recording forever.
///
/// In replay mode a single read stops at the end of the recording rather
/// than wrapping mid-call, so it can return fewer bytes than requested.
/// Use [`read_full`](crate::pcm::read_full) when a full buffer is needed.
///
/// A source that ends without producing any bytes leaves the recording
/// empty and every later read returns zero bytes; callers should not loop
/// empty sources.
pub struct LoopingReader<R> {
    inner: R,
    recording: Vec<u8>,
    offset: usize,
    replaying: bool,
}

impl<R: Reader> LoopingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            recording: Vec::new(),
            offset: 0,
            replaying: false,
        }
    }

    /// Whether the wrapped reader has ended and reads come from the recording
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Bytes recorded so far
    pub fn recorded_len(&self) -> usize {
        self.recording.len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Reader> Reader for LoopingReader<R> {
    fn format(&self) -> Format {
        self.inner.format()
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.replaying {
            let n = buf.len().min(self.recording.len() - self.offset);
            buf[..n].copy_from_slice(&self.recording[self.offset..self.offset + n]);
            self.offset += n;
            if self.offset >= self.recording.len() {
                self.offset = 0;
            }
            return Ok(ReadStatus::more(n));
        }

        let status = self.inner.read_pcm(buf)?;
        self.recording.extend_from_slice(&buf[..status.len]);
        if status.end_of_stream {
            self.replaying = true;
            // Sources that signal the end on an empty read start the replay here.
            if status.len == 0 && !self.recording.is_empty() {
                return self.read_pcm(buf);
            }
        }
        Ok(ReadStatus::more(status.len))
    }
}
