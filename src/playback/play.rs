//! The playback scheduler: paces a reader into a writer in real time.
//!
//! # Timing
//!
//! The platform sink plays from a circular buffer whose read cursor moves
//! in real time. `play` keeps its write cursor a fixed margin ahead of it:
//!
//! 1. **Priming**: `chase_increments` chunks are written back to back, so the
//!    sink holds `chase_increments * copy_increment` of audio.
//! 2. **Streaming**: every `copy_increment` one more chunk is written. One
//!    increment is added while one is consumed, so the margin stays put.
//!
//! With two increments of margin there is one increment of slack for
//! scheduling jitter before the device would read stale data.
//!
//! # Cancellation
//!
//! Checked once per tick, never mid-chunk: the chunk in flight finishes
//! writing first, so shutdown latency is about one `copy_increment`.
//!
//! # Cleanup
//!
//! Once the format check has passed, the writer is reset exactly once on
//! every way out of `play`: end-of-stream, cancellation, a read or write
//! failure, or a panic in the reader.

use std::io;
use crossbeam::channel::{self, select};
use tracing::{debug, trace, warn};
use crate::audio::writer::{Writer, WriterError};
use crate::core::format::{Format, FormatError};
use crate::pcm::reader::{read_full, Reader};
use crate::playback::cancel::CancelSignal;
use crate::playback::options::PlayOptions;
use crate::playback::progress::Progress;
use crate::playback::state::PlayState;

/// Error type for playback
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error("format mismatch: reader is {reader}, writer is {writer}")]
    FormatMismatch { reader: Format, writer: Format },
    #[error("invalid writer format: {0}")]
    InvalidFormat(#[from] FormatError),
    #[error("invalid play options: {0}")]
    InvalidOptions(String),
    #[error("failed to read: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write: {0}")]
    Write(#[source] WriterError),
    #[error("failed to open writer: {0}")]
    Open(#[source] WriterError),
    #[error("failed to spawn playback worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("playback worker panicked")]
    WorkerPanicked,
}

/// How a successful playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The reader reached end-of-stream
    Finished,
    /// The cancel signal fired
    Cancelled,
}

/// Stream `reader` into `writer` until end-of-stream or cancellation.
///
/// Blocks the calling thread; run one call per concurrently playing sound,
/// each with its own writer.
pub fn play<W, R>(
    writer: &mut W,
    reader: &mut R,
    options: &PlayOptions,
    cancel: &CancelSignal,
) -> Result<PlayOutcome, PlayError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    play_with_progress(writer, reader, options, cancel, &Progress::new())
}

/// [`play`], publishing state and written bytes to `progress` as it goes.
pub fn play_with_progress<W, R>(
    writer: &mut W,
    reader: &mut R,
    options: &PlayOptions,
    cancel: &CancelSignal,
    progress: &Progress,
) -> Result<PlayOutcome, PlayError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    let result = run(writer, reader, options, cancel, progress);
    progress.set_state(match &result {
        Ok(PlayOutcome::Finished) => PlayState::Done,
        Ok(PlayOutcome::Cancelled) => PlayState::Cancelled,
        Err(_) => PlayState::Failed,
    });
    match &result {
        Ok(outcome) => debug!(?outcome, bytes = progress.bytes_written(), "playback returned"),
        Err(e) => debug!(error = %e, bytes = progress.bytes_written(), "playback failed"),
    }
    result
}

fn run<W, R>(
    writer: &mut W,
    reader: &mut R,
    options: &PlayOptions,
    cancel: &CancelSignal,
    progress: &Progress,
) -> Result<PlayOutcome, PlayError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    options.validate()?;
    let format = writer.format();
    if !options.allow_mismatched_formats && reader.format() != format {
        return Err(PlayError::FormatMismatch {
            reader: reader.format(),
            writer: format,
        });
    }
    format.validate()?;
    let chunk_size = options.chunk_size(&format)?;

    let mut sink = ResetOnExit { writer };
    let mut buf = vec![0u8; chunk_size];
    progress.begin(&format);

    progress.set_state(PlayState::Priming);
    debug!(
        %format,
        chunk_size,
        chase_increments = options.chase_increments,
        copy_increment = ?options.copy_increment,
        "priming writer"
    );
    for primed in 1..=options.chase_increments {
        let status = read_full(reader, &mut buf).map_err(PlayError::Read)?;
        sink.write(&buf[..status.len], progress)?;
        if status.end_of_stream {
            debug!(primed, "stream ended while priming");
            return Ok(drain(options, cancel, progress, primed));
        }
    }

    progress.set_state(PlayState::Streaming);
    let ticker = channel::tick(options.copy_increment);
    loop {
        let cancelled = select! {
            recv(ticker) -> _ => false,
            recv(cancel.receiver()) -> _ => true,
        };
        if cancelled {
            debug!("playback cancelled");
            return Ok(PlayOutcome::Cancelled);
        }

        let status = read_full(reader, &mut buf).map_err(PlayError::Read)?;
        trace!(len = status.len, "tick");
        sink.write(&buf[..status.len], progress)?;
        if status.end_of_stream {
            debug!("stream ended");
            return Ok(drain(options, cancel, progress, options.chase_increments));
        }
    }
}

/// With `drain_on_end`, wait out the `increments` of audio still queued in
/// the writer before the reset clears them.
fn drain(
    options: &PlayOptions,
    cancel: &CancelSignal,
    progress: &Progress,
    increments: u32,
) -> PlayOutcome {
    if !options.drain_on_end {
        return PlayOutcome::Finished;
    }
    progress.set_state(PlayState::Draining);
    let deadline = channel::after(options.copy_increment * increments);
    select! {
        recv(deadline) -> _ => PlayOutcome::Finished,
        recv(cancel.receiver()) -> _ => PlayOutcome::Cancelled,
    }
}

/// Borrows the writer for the length of a playback and resets it when
/// dropped, whichever way the playback ends.
struct ResetOnExit<'a, W: Writer + ?Sized> {
    writer: &'a mut W,
}

impl<W: Writer + ?Sized> ResetOnExit<'_, W> {
    fn write(&mut self, chunk: &[u8], progress: &Progress) -> Result<(), PlayError> {
        if chunk.is_empty() {
            return Ok(());
        }
        let written = self.writer.write_pcm(chunk).map_err(PlayError::Write)?;
        progress.add_written(written);
        Ok(())
    }
}

impl<W: Writer + ?Sized> Drop for ResetOnExit<'_, W> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.reset() {
            warn!("failed to reset writer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use crate::audio::memory::{MemoryWriter, SinkEvent};
    use crate::pcm::bytes::BytesReader;
    use crate::pcm::looping::LoopingReader;
    use crate::pcm::reader::ReadStatus;
    use crate::playback::cancel::cancel_pair;

    /// 1000 bytes per second, so a 10 ms increment is a 10-byte chunk
    const SLOW: Format = Format::new(1000, 1, 8);

    fn options(increment_ms: u64) -> PlayOptions {
        PlayOptions::new().with_copy_increment(Duration::from_millis(increment_ms))
    }

    fn clip(len: usize) -> BytesReader {
        BytesReader::new(SLOW, (0..len).map(|i| i as u8).collect())
    }

    /// Reads fine a few times, then fails
    struct Failing {
        reads_left: usize,
    }

    impl Reader for Failing {
        fn format(&self) -> Format {
            SLOW
        }

        fn read_pcm(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
            if self.reads_left == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            self.reads_left -= 1;
            buf.fill(1);
            Ok(ReadStatus::more(buf.len()))
        }
    }

    #[test]
    fn test_format_mismatch_touches_nothing() {
        let mut writer = MemoryWriter::new(Format::new(48000, 2, 16));
        let mut reader = BytesReader::new(Format::new(44100, 2, 16), vec![0; 1024]);

        let result = play(&mut writer, &mut reader, &PlayOptions::default(), &CancelSignal::never());

        assert!(matches!(result, Err(PlayError::FormatMismatch { .. })));
        assert!(writer.recording().events.is_empty());
        assert_eq!(reader.offset(), 0);
    }

    #[test]
    fn test_mismatch_allowed() {
        let mut writer = MemoryWriter::new(SLOW);
        let mut reader = BytesReader::new(Format::new(2000, 1, 8), vec![0; 15]);
        let options = options(10).with_allow_mismatched_formats(true);

        let result = play(&mut writer, &mut reader, &options, &CancelSignal::never());

        assert_eq!(result.unwrap(), PlayOutcome::Finished);
        assert_eq!(writer.recording().written.len(), 15);
    }

    #[test]
    fn test_invalid_options_touch_nothing() {
        let mut writer = MemoryWriter::new(SLOW);
        let options = options(10).with_chase_increments(1);

        let result = play(&mut writer, &mut clip(100), &options, &CancelSignal::never());

        assert!(matches!(result, Err(PlayError::InvalidOptions(_))));
        assert!(writer.recording().events.is_empty());
    }

    #[test]
    fn test_invalid_writer_format() {
        let format = Format::new(1000, 1, 24);
        let mut writer = MemoryWriter::new(format);
        let mut reader = BytesReader::new(format, vec![0; 30]);

        let result = play(&mut writer, &mut reader, &options(10), &CancelSignal::never());

        assert!(matches!(result, Err(PlayError::InvalidFormat(_))));
    }

    #[test]
    fn test_short_clip_finishes_while_priming() {
        // 200 ms increments: a 200-byte chunk, clip fits in 1.5 chunks.
        let mut writer = MemoryWriter::new(SLOW);
        let started = Instant::now();

        let result = play(&mut writer, &mut clip(300), &options(200), &CancelSignal::never());

        assert_eq!(result.unwrap(), PlayOutcome::Finished);
        assert!(started.elapsed() < Duration::from_millis(200));
        let recording = writer.recording();
        assert_eq!(
            recording.events,
            vec![SinkEvent::Write(200), SinkEvent::Write(100), SinkEvent::Reset]
        );
        assert_eq!(recording.written, clip(300).into_inner());
    }

    #[test]
    fn test_streams_whole_clip_then_resets() {
        let mut writer = MemoryWriter::new(SLOW);
        let progress = Progress::new();

        let result = play_with_progress(
            &mut writer,
            &mut clip(50),
            &options(10),
            &CancelSignal::never(),
            &progress,
        );

        assert_eq!(result.unwrap(), PlayOutcome::Finished);
        let recording = writer.recording();
        assert_eq!(recording.writes(), 5);
        assert_eq!(recording.resets(), 1);
        assert_eq!(recording.events.last(), Some(&SinkEvent::Reset));
        assert_eq!(recording.written, clip(50).into_inner());
        assert_eq!(progress.state(), PlayState::Done);
        assert_eq!(progress.bytes_written(), 50);
    }

    #[test]
    fn test_short_final_chunk_is_not_padded() {
        let mut writer = MemoryWriter::new(SLOW);

        play(&mut writer, &mut clip(25), &options(10), &CancelSignal::never()).unwrap();

        let recording = writer.recording();
        assert_eq!(
            recording.events,
            vec![
                SinkEvent::Write(10),
                SinkEvent::Write(10),
                SinkEvent::Write(5),
                SinkEvent::Reset
            ]
        );
    }

    #[test]
    fn test_cancel_before_first_tick() {
        let mut writer = MemoryWriter::new(SLOW);
        let mut reader = LoopingReader::new(clip(16));
        let (canceller, signal) = cancel_pair();
        canceller.cancel();

        let result = play(&mut writer, &mut reader, &options(100), &signal);

        assert_eq!(result.unwrap(), PlayOutcome::Cancelled);
        let recording = writer.recording();
        assert_eq!(recording.writes(), 2);
        assert_eq!(recording.resets(), 1);
    }

    #[test]
    fn test_cancel_mid_stream() {
        let mut writer = MemoryWriter::new(SLOW);
        let mut reader = LoopingReader::new(clip(16));
        let (canceller, signal) = cancel_pair();
        let progress = Progress::new();

        let cancel_thread = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            canceller.cancel();
        });
        let result = play_with_progress(&mut writer, &mut reader, &options(5), &signal, &progress);
        cancel_thread.join().unwrap();

        assert_eq!(result.unwrap(), PlayOutcome::Cancelled);
        assert_eq!(progress.state(), PlayState::Cancelled);
        let recording = writer.recording();
        assert!(recording.writes() > 2, "{:?}", recording.events);
        assert_eq!(recording.resets(), 1);
        assert_eq!(recording.writes_after_last_reset(), 0);
        assert_eq!(recording.events.last(), Some(&SinkEvent::Reset));
    }

    #[test]
    fn test_read_error_is_wrapped() {
        let mut writer = MemoryWriter::new(SLOW);
        let mut reader = Failing { reads_left: 3 };
        let progress = Progress::new();

        let result = play_with_progress(
            &mut writer,
            &mut reader,
            &options(5),
            &CancelSignal::never(),
            &progress,
        );

        let err = result.unwrap_err();
        assert!(matches!(err, PlayError::Read(_)));
        assert!(err.to_string().starts_with("failed to read"));
        assert_eq!(progress.state(), PlayState::Failed);
        let recording = writer.recording();
        assert_eq!(recording.writes(), 3);
        assert_eq!(recording.resets(), 1);
    }

    #[test]
    fn test_write_error_is_wrapped() {
        let mut writer = MemoryWriter::new(SLOW).fail_after(1);
        let mut reader = LoopingReader::new(clip(16));

        let result = play(&mut writer, &mut reader, &options(5), &CancelSignal::never());

        let err = result.unwrap_err();
        assert!(matches!(err, PlayError::Write(WriterError::Device(_))));
        assert!(err.to_string().starts_with("failed to write"));
        assert_eq!(writer.recording().writes(), 1);
        assert_eq!(writer.recording().resets(), 1);
    }

    #[test]
    fn test_drain_waits_for_buffered_audio() {
        let mut writer = MemoryWriter::new(SLOW);
        let options = options(20).with_drain_on_end(true);
        let started = Instant::now();

        let result = play(&mut writer, &mut clip(15), &options, &CancelSignal::never());

        assert_eq!(result.unwrap(), PlayOutcome::Finished);
        // One primed chunk to play out.
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(writer.recording().resets(), 1);
    }

    #[test]
    fn test_drain_honors_cancel() {
        let mut writer = MemoryWriter::new(SLOW);
        let options = options(500).with_drain_on_end(true);
        let (canceller, signal) = cancel_pair();
        canceller.cancel();

        let result = play(&mut writer, &mut clip(100), &options, &signal);

        assert_eq!(result.unwrap(), PlayOutcome::Cancelled);
    }
}
