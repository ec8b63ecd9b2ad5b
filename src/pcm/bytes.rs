//! In-memory, rewindable PCM source used to cache decoded audio.

use std::io;
use crate::core::format::Format;
use crate::pcm::reader::{ReadStatus, Reader};

/// Initial read size used by [`read_all`] when growing its buffer
const READ_ALL_CHUNK: usize = 16 * 1024;

/// A [`Reader`] over an owned byte buffer.
///
/// The read offset is private state; two playbacks of the same cached sound
/// must each get their own [`copy`](BytesReader::copy) so their offsets
/// cannot interfere.
#[derive(Debug)]
pub struct BytesReader {
    format: Format,
    data: Vec<u8>,
    offset: usize,
}

impl BytesReader {
    pub fn new(format: Format, data: Vec<u8>) -> Self {
        Self {
            format,
            data,
            offset: 0,
        }
    }

    /// A new reader with its own copy of the buffer, positioned at the start
    pub fn copy(&self) -> Self {
        Self {
            format: self.format,
            data: self.data.clone(),
            offset: 0,
        }
    }

    /// Move the read offset back to the start
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// Total buffered bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Current read offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Reader for BytesReader {
    fn format(&self) -> Format {
        self.format
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(ReadStatus {
            len: n,
            end_of_stream: self.offset == self.data.len(),
        })
    }
}

/// Drain `reader` into a new [`BytesReader`].
///
/// Never returns for a reader that does not end (a `LoopingReader` or a
/// generator); only pass finite sources.
pub fn read_all<R: Reader + ?Sized>(reader: &mut R) -> io::Result<BytesReader> {
    let format = reader.format();
    let mut data = Vec::new();
    let mut chunk = vec![0u8; READ_ALL_CHUNK];
    loop {
        let status = reader.read_pcm(&mut chunk)?;
        data.extend_from_slice(&chunk[..status.len]);
        if status.end_of_stream {
            break;
        }
        if status.len == chunk.len() {
            // Source keeps filling the chunk; grow it to cut down on calls.
            chunk.resize(chunk.len() * 2, 0);
        }
    }
    Ok(BytesReader::new(format, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_bytes() -> BytesReader {
        BytesReader::new(Format::new(8000, 1, 8), (0..10).collect())
    }

    #[test]
    fn test_exhaustion() {
        let mut reader = ten_bytes();
        let mut buf = [0u8; 4];

        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::more(4));
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::more(4));
        assert_eq!(buf, [4, 5, 6, 7]);
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::end(2));
        assert_eq!(&buf[..2], &[8, 9]);
    }

    #[test]
    fn test_exact_fit_signals_end() {
        let mut reader = ten_bytes();
        let mut buf = [0u8; 10];
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::end(10));
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::end(0));
    }

    #[test]
    fn test_empty_reader_ends_immediately() {
        let mut reader = BytesReader::new(Format::new(8000, 1, 8), Vec::new());
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::end(0));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = ten_bytes();
        let mut buf = [0u8; 3];
        original.read_pcm(&mut buf).unwrap();

        let mut copy = original.copy();
        assert_eq!(copy.offset(), 0);

        let mut big = [0u8; 8];
        copy.read_pcm(&mut big).unwrap();
        assert_eq!(copy.offset(), 8);
        assert_eq!(original.offset(), 3);
        assert_eq!(original.as_bytes(), copy.as_bytes());

        let mut rest = [0u8; 7];
        assert_eq!(original.read_pcm(&mut rest).unwrap(), ReadStatus::end(7));
        assert_eq!(rest, [3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_rewind() {
        let mut reader = ten_bytes();
        let mut buf = [0u8; 10];
        reader.read_pcm(&mut buf).unwrap();
        assert_eq!(reader.remaining(), 0);
        reader.rewind();
        assert_eq!(reader.remaining(), 10);
    }

    #[test]
    fn test_read_all() {
        let data: Vec<u8> = (0..50_000u32).map(|i| i as u8).collect();
        let mut source = BytesReader::new(Format::new(44100, 2, 16), data.clone());
        let cached = read_all(&mut source).unwrap();
        assert_eq!(cached.format(), Format::new(44100, 2, 16));
        assert_eq!(cached.as_bytes(), &data[..]);
        assert_eq!(cached.offset(), 0);
    }
}
