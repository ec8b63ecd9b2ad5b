//! Linear fade-in / fade-out filters applied to PCM as it streams through.
//!
//! Both filters scale samples in place inside the caller's buffer during
//! `read_pcm`, so they compose with `LoopingReader` and with sources that
//! never end. Gain is applied per whole sample even when reads split one,
//! in the source or in the caller's buffer.
//!
//! Sample width is dispatched on [`BitDepth`]:
//! - 8-bit: each byte is a signed sample
//! - 16-bit: little-endian `i16`
//! - 32-bit: little-endian `i32`
//!
//! Any other width passes through unmodified. Fades are cosmetic, so an
//! unsupported width is not an error here (unlike opening a sink).

use std::io;
use std::time::Duration;
use crate::core::format::{BitDepth, Format};
use crate::core::time::bytes_for;
use crate::pcm::reader::{ReadStatus, Reader};

/// Wrap `reader` so its first `duration` ramps linearly up from silence.
pub fn fade_in<R: Reader>(duration: Duration, reader: R) -> FadeIn<R> {
    let total = bytes_for(&reader.format(), duration);
    FadeIn {
        inner: reader,
        span: FadeSpan::new(total),
        carry: Carry::default(),
    }
}

/// Wrap `reader` so it ramps linearly down to silence over `duration`, then
/// stays silent.
pub fn fade_out<R: Reader>(duration: Duration, reader: R) -> FadeOut<R> {
    let total = bytes_for(&reader.format(), duration);
    FadeOut {
        inner: reader,
        span: FadeSpan::new(total),
        carry: Carry::default(),
    }
}

/// Bytes left to fade out of the original span; `0 <= remaining <= total`
#[derive(Debug, Clone, Copy)]
struct FadeSpan {
    remaining: u64,
    total: u64,
}

impl FadeSpan {
    fn new(total: u64) -> Self {
        Self {
            remaining: total,
            total,
        }
    }

    /// Share of the span already consumed, in `[0, 1]`
    fn elapsed(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        ((self.total - self.remaining) as f64 / self.total as f64).min(1.0)
    }

    /// Share of the span still to go, in `[0, 1]`
    fn left(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.remaining as f64 / self.total as f64).max(0.0)
    }

    fn advance(&mut self, bytes: usize) {
        self.remaining = self.remaining.saturating_sub(bytes as u64);
    }
}

/// Per-sample state kept across reads that split a sample.
///
/// A split sample is completed from the source in `raw` before it is
/// scaled; whatever part of it does not fit the caller's buffer waits in
/// `out` and leads the next read, so every read still fills as much of the
/// caller's buffer as the source allows.
#[derive(Debug, Default, Clone, Copy)]
struct Carry {
    /// Leading bytes of a sample the source has not finished delivering
    raw: [u8; 4],
    raw_len: usize,
    /// Scaled bytes not yet handed out
    out: [u8; 4],
    out_pos: usize,
    out_len: usize,
    /// The source reported end-of-stream
    ended: bool,
}

impl Carry {
    fn is_empty(&self) -> bool {
        self.raw_len == 0 && self.out_pos == self.out_len
    }

    /// Read from `inner` into `buf`, calling `scale` on every whole sample
    /// exactly once and in stream order. A sample cut short by the end of
    /// the stream is zeroed when `zero_partial` is set, else left as is.
    fn read<R, S>(
        &mut self,
        inner: &mut R,
        buf: &mut [u8],
        width: usize,
        zero_partial: bool,
        mut scale: S,
    ) -> io::Result<ReadStatus>
    where
        R: Reader + ?Sized,
        S: FnMut(&mut [u8]),
    {
        let mut n = 0;
        loop {
            let take = (self.out_len - self.out_pos).min(buf.len() - n);
            buf[n..n + take].copy_from_slice(&self.out[self.out_pos..self.out_pos + take]);
            self.out_pos += take;
            n += take;
            if self.out_pos < self.out_len {
                return Ok(ReadStatus::more(n));
            }
            if self.ended {
                return Ok(ReadStatus::end(n));
            }
            if n == buf.len() {
                return Ok(ReadStatus::more(n));
            }

            if self.raw_len > 0 {
                let status = inner.read_pcm(&mut self.raw[self.raw_len..width])?;
                self.raw_len += status.len;
                if self.raw_len == width {
                    scale(&mut self.raw[..width]);
                } else if status.end_of_stream {
                    if zero_partial {
                        self.raw[..self.raw_len].fill(0);
                    }
                } else if status.len == 0 {
                    return Ok(ReadStatus::more(n));
                } else {
                    continue;
                }
                self.ended = status.end_of_stream;
                self.out[..self.raw_len].copy_from_slice(&self.raw[..self.raw_len]);
                self.out_pos = 0;
                self.out_len = self.raw_len;
                self.raw_len = 0;
                continue;
            }

            let status = inner.read_pcm(&mut buf[n..])?;
            let len = status.len;
            let whole = len - len % width;
            scale(&mut buf[n..n + whole]);
            if status.end_of_stream {
                if zero_partial {
                    buf[n + whole..n + len].fill(0);
                }
                self.ended = true;
                return Ok(ReadStatus::end(n + len));
            }
            if whole == len {
                return Ok(ReadStatus::more(n + len));
            }
            // Stage the split sample; it is handed out once complete.
            let tail = len - whole;
            self.raw[..tail].copy_from_slice(&buf[n + whole..n + len]);
            self.raw_len = tail;
            n += whole;
        }
    }
}

/// Scale every sample in `buf`, computing the gain per sample. `buf` holds
/// whole samples only.
fn scale_samples<F>(buf: &mut [u8], depth: BitDepth, mut gain: F)
where
    F: FnMut() -> f64,
{
    match depth {
        BitDepth::Eight => {
            for byte in buf.iter_mut() {
                let sample = *byte as i8;
                *byte = (sample as f64 * gain()) as i8 as u8;
            }
        }
        BitDepth::Sixteen => {
            for bytes in buf.chunks_exact_mut(2) {
                let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
                let scaled = (sample as f64 * gain()) as i16;
                bytes.copy_from_slice(&scaled.to_le_bytes());
            }
        }
        BitDepth::ThirtyTwo => {
            for bytes in buf.chunks_exact_mut(4) {
                let sample = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let scaled = (sample as f64 * gain()) as i32;
                bytes.copy_from_slice(&scaled.to_le_bytes());
            }
        }
    }
}

/// Fade-in filter; a passthrough once the span is consumed.
pub struct FadeIn<R> {
    inner: R,
    span: FadeSpan,
    carry: Carry,
}

impl<R> FadeIn<R> {
    /// Bytes still to be faded
    pub fn remaining(&self) -> u64 {
        self.span.remaining
    }

    /// Length of the fade in bytes
    pub fn total(&self) -> u64 {
        self.span.total
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Reader> Reader for FadeIn<R> {
    fn format(&self) -> Format {
        self.inner.format()
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let depth = match self.inner.format().bit_depth() {
            Some(depth) => depth,
            None => return self.inner.read_pcm(buf),
        };
        // Past the ramp and on a sample boundary: nothing left to do.
        if self.span.remaining == 0 && self.carry.is_empty() {
            return self.inner.read_pcm(buf);
        }

        let width = depth.bytes();
        let span = &mut self.span;
        let mut gain = || {
            if span.remaining == 0 {
                return 1.0;
            }
            let gain = span.elapsed();
            span.advance(width);
            gain
        };
        self.carry.read(&mut self.inner, buf, width, false, |samples| {
            scale_samples(samples, depth, &mut gain)
        })
    }
}

/// Fade-out filter; silences everything once the span is consumed.
pub struct FadeOut<R> {
    inner: R,
    span: FadeSpan,
    carry: Carry,
}

impl<R> FadeOut<R> {
    /// Bytes still to be faded
    pub fn remaining(&self) -> u64 {
        self.span.remaining
    }

    /// Length of the fade in bytes
    pub fn total(&self) -> u64 {
        self.span.total
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Reader> Reader for FadeOut<R> {
    fn format(&self) -> Format {
        self.inner.format()
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let depth = match self.inner.format().bit_depth() {
            Some(depth) => depth,
            None => return self.inner.read_pcm(buf),
        };

        let width = depth.bytes();
        let span = &mut self.span;
        let mut gain = || {
            let gain = span.left();
            span.advance(width);
            gain
        };
        self.carry.read(&mut self.inner, buf, width, true, |samples| {
            scale_samples(samples, depth, &mut gain)
        })
    }
}
