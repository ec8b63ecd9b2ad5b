//! Headerless PCM from any `std::io::Read` (files, pipes, sockets).

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use crate::core::format::Format;
use crate::pcm::reader::{ReadStatus, Reader};

/// Adapts a byte stream of raw PCM with a declared format into a [`Reader`].
///
/// The format is taken on trust; nothing in the stream is parsed.
pub struct IoReader<R> {
    inner: R,
    format: Format,
}

impl<R: Read> IoReader<R> {
    pub fn new(inner: R, format: Format) -> Self {
        Self { inner, format }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl IoReader<BufReader<File>> {
    /// Open a raw PCM file
    pub fn open<P: AsRef<Path>>(path: P, format: Format) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), format))
    }
}

impl<R: Read> Reader for IoReader<R> {
    fn format(&self) -> Format {
        self.format
    }

    fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if buf.is_empty() {
            return Ok(ReadStatus::more(0));
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Ok(ReadStatus::end(0)),
                Ok(n) => return Ok(ReadStatus::more(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use crate::pcm::bytes::read_all;

    #[test]
    fn test_cursor_source() {
        let format = Format::new(8000, 1, 8);
        let mut reader = IoReader::new(Cursor::new(vec![1u8, 2, 3]), format);
        let mut buf = [0u8; 2];

        assert_eq!(reader.format(), format);
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::more(2));
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::more(1));
        assert_eq!(reader.read_pcm(&mut buf).unwrap(), ReadStatus::end(0));
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 100]).unwrap();
        file.flush().unwrap();

        let mut reader = IoReader::open(file.path(), Format::new(44100, 2, 16)).unwrap();
        let cached = read_all(&mut reader).unwrap();
        assert_eq!(cached.len(), 100);
        assert!(cached.as_bytes().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_open_missing_file() {
        let result = IoReader::open("/definitely/not/here.pcm", Format::new(44100, 2, 16));
        assert!(result.is_err());
    }
}
