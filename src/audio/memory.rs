//! In-memory sink that records everything it is given.
//!
//! Used for offline rendering and as a test double: every write, reset and
//! close is logged in order so callers can assert on exactly what a
//! playback did to its sink.

use std::sync::{Arc, Mutex, MutexGuard};
use crate::audio::writer::{Writer, WriterError, WriterFactory};
use crate::core::format::Format;

/// One call made on a [`MemoryWriter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// `write_pcm` with this many bytes
    Write(usize),
    Reset,
    Close,
}

/// Everything a [`MemoryWriter`] has seen
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Bytes written since the last reset
    pub pending: Vec<u8>,
    /// Every byte ever written
    pub written: Vec<u8>,
    /// Calls in the order they were made
    pub events: Vec<SinkEvent>,
}

impl Recording {
    pub fn writes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Write(_)))
            .count()
    }

    pub fn resets(&self) -> usize {
        self.events.iter().filter(|e| **e == SinkEvent::Reset).count()
    }

    pub fn closed(&self) -> bool {
        self.events.contains(&SinkEvent::Close)
    }

    /// Writes made after the last reset
    pub fn writes_after_last_reset(&self) -> usize {
        self.events
            .iter()
            .rev()
            .take_while(|e| **e != SinkEvent::Reset)
            .filter(|e| matches!(e, SinkEvent::Write(_)))
            .count()
    }
}

#[derive(Debug, Default)]
struct State {
    recording: Recording,
    fail_after: Option<usize>,
    closed: bool,
}

/// A [`Writer`] backed by memory. Clones share the same recording.
#[derive(Debug, Clone)]
pub struct MemoryWriter {
    format: Format,
    state: Arc<Mutex<State>>,
}

impl MemoryWriter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Make every write after the first `writes` fail with a device error
    pub fn fail_after(self, writes: usize) -> Self {
        self.lock().fail_after = Some(writes);
        self
    }

    /// Snapshot of everything recorded so far
    pub fn recording(&self) -> Recording {
        self.lock().recording.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide what was recorded.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Writer for MemoryWriter {
    fn format(&self) -> Format {
        self.format
    }

    fn write_pcm(&mut self, buf: &[u8]) -> Result<usize, WriterError> {
        let mut state = self.lock();
        if state.closed {
            return Err(WriterError::Closed);
        }
        if let Some(limit) = state.fail_after {
            if state.recording.writes() >= limit {
                return Err(WriterError::Device("simulated device failure".to_string()));
            }
        }
        let recording = &mut state.recording;
        recording.pending.extend_from_slice(buf);
        recording.written.extend_from_slice(buf);
        recording.events.push(SinkEvent::Write(buf.len()));
        Ok(buf.len())
    }

    fn reset(&mut self) -> Result<(), WriterError> {
        let mut state = self.lock();
        if state.closed {
            return Err(WriterError::Closed);
        }
        state.recording.pending.clear();
        state.recording.events.push(SinkEvent::Reset);
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.recording.events.push(SinkEvent::Close);
        }
        Ok(())
    }
}

/// Factory that hands out clones of one [`MemoryWriter`], so the opener's
/// writes stay observable through [`MemoryFactory::writer`].
#[derive(Debug, Clone)]
pub struct MemoryFactory {
    writer: MemoryWriter,
}

impl MemoryFactory {
    pub fn new(writer: MemoryWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &MemoryWriter {
        &self.writer
    }
}

impl WriterFactory for MemoryFactory {
    fn open(&self, format: Format) -> Result<Box<dyn Writer + Send>, WriterError> {
        format
            .validate()
            .map_err(|e| WriterError::invalid_format(format, e))?;
        if format != self.writer.format {
            return Err(WriterError::unsupported(
                format,
                format!("memory sink is fixed at {}", self.writer.format),
            ));
        }
        Ok(Box::new(self.writer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: Format = Format::new(44100, 2, 16);

    #[test]
    fn test_records_writes_and_resets() {
        let mut writer = MemoryWriter::new(FORMAT);
        writer.write_pcm(&[1, 2, 3, 4]).unwrap();
        writer.write_pcm(&[5, 6]).unwrap();
        writer.reset().unwrap();
        writer.write_pcm(&[7, 8]).unwrap();

        let recording = writer.recording();
        assert_eq!(recording.writes(), 3);
        assert_eq!(recording.resets(), 1);
        assert_eq!(recording.pending, vec![7, 8]);
        assert_eq!(recording.written, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(recording.writes_after_last_reset(), 1);
    }

    #[test]
    fn test_clones_share_recording() {
        let writer = MemoryWriter::new(FORMAT);
        let mut clone = writer.clone();
        clone.write_pcm(&[0; 8]).unwrap();
        assert_eq!(writer.recording().written.len(), 8);
    }

    #[test]
    fn test_closed_writer_rejects_writes() {
        let mut writer = MemoryWriter::new(FORMAT);
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.write_pcm(&[0; 4]), Err(WriterError::Closed)));
        assert!(writer.recording().closed());
        assert_eq!(writer.recording().events, vec![SinkEvent::Close]);
    }

    #[test]
    fn test_fail_after() {
        let mut writer = MemoryWriter::new(FORMAT).fail_after(1);
        assert!(writer.write_pcm(&[0; 4]).is_ok());
        assert!(matches!(writer.write_pcm(&[0; 4]), Err(WriterError::Device(_))));
    }

    #[test]
    fn test_factory_checks_format() {
        let factory = MemoryFactory::new(MemoryWriter::new(FORMAT));
        assert!(factory.open(FORMAT).is_ok());
        assert!(matches!(
            factory.open(Format::new(48000, 2, 16)),
            Err(WriterError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            factory.open(Format::new(44100, 2, 24)),
            Err(WriterError::UnsupportedFormat { .. })
        ));
    }
}
