//! cpal-backed platform sink.
//!
//! # Design
//!
//! `cpal::Stream` is not `Send`, but a writer has to move onto whichever
//! worker runs the playback. The stream therefore lives on a dedicated
//! device thread for the writer's whole lifetime; the writer itself only
//! holds the producer end of a ring buffer:
//!
//! ```text
//! write_pcm ──bytes→f32──> HeapRb<f32> ──> cpal callback ──> device
//!                              ^
//!                 reset clears what is still queued
//! ```
//!
//! The ring is the sink's circular buffer: `write_pcm` waits while it is
//! full, and the callback drains it in real time. An empty ring in the
//! callback is an underrun and is filled with silence. The consumer sits
//! behind a mutex so `reset` can clear it from the writer side; the
//! callback only ever `try_lock`s it and plays silence while a reset holds
//! the lock.
//!
//! # Failure Modes
//!
//! - No default output device: `open` returns `WriterError::NoDevice`
//! - Channel count or sample rate the device cannot take, or no `f32`
//!   output: `open` returns `WriterError::UnsupportedFormat`
//! - Device stops consuming (unplugged, suspended): a write that cannot make
//!   progress for `STALL_TIMEOUT` fails with `WriterError::Device`
//! - Stream errors reported by cpal after open are logged, not propagated

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};
use crossbeam::channel::{self, Receiver, Sender};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, info, warn};
use crate::audio::writer::{Writer, WriterError, WriterFactory};
use crate::core::format::{BitDepth, Format};
use crate::core::time::bytes_for;

/// Default amount of audio the sink buffers ahead of the device
pub const DEFAULT_BUFFER: Duration = Duration::from_millis(500);

/// How long a write may wait on a full buffer before the device is
/// considered gone
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Wait between attempts to push into a full ring
const FULL_POLL: Duration = Duration::from_millis(2);

type SharedConsumer = Arc<Mutex<HeapCons<f32>>>;

/// Opens [`CpalWriter`]s on the default host's default output device.
#[derive(Debug, Clone)]
pub struct CpalFactory {
    buffer: Duration,
}

impl CpalFactory {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Use a sink buffer of `buffer` worth of audio
    pub fn with_buffer(buffer: Duration) -> Self {
        Self { buffer }
    }
}

impl Default for CpalFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterFactory for CpalFactory {
    fn open(&self, format: Format) -> Result<Box<dyn Writer + Send>, WriterError> {
        Ok(Box::new(CpalWriter::open(format, self.buffer)?))
    }
}

/// Platform sink writing to a cpal output stream.
pub struct CpalWriter {
    format: Format,
    depth: BitDepth,
    /// Producer side of the ring; `None` once closed
    producer: Option<HeapProd<f32>>,
    /// Shared with the stream callback; `reset` clears it
    consumer: SharedConsumer,
    /// Bytes of a sample split across two writes
    carry: Vec<u8>,
    /// Samples decoded from the current write
    decoded: Vec<f32>,
    /// Dropping this stops the device thread
    shutdown: Option<Sender<()>>,
    device_thread: Option<JoinHandle<()>>,
}

impl CpalWriter {
    /// Open the default output device for `format`, buffering up to
    /// `buffer` of audio ahead of playback.
    pub fn open(format: Format, buffer: Duration) -> Result<Self, WriterError> {
        format
            .validate()
            .map_err(|e| WriterError::invalid_format(format, e))?;
        let depth = format
            .bit_depth()
            .ok_or_else(|| WriterError::unsupported(format, "unsupported bit depth"))?;

        let capacity = (bytes_for(&format, buffer) as usize / depth.bytes())
            .max(format.channels as usize);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let consumer: SharedConsumer = Arc::new(Mutex::new(consumer));
        let (ready_tx, ready_rx) = channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let callback_consumer = Arc::clone(&consumer);
        let device_thread = thread::Builder::new()
            .name("pcm-device".to_string())
            .spawn(move || run_device(format, callback_consumer, shutdown_rx, ready_tx))
            .map_err(|e| WriterError::Device(format!("failed to spawn device thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = device_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = device_thread.join();
                return Err(WriterError::Device(
                    "device thread exited while opening".to_string(),
                ));
            }
        }

        info!(%format, capacity, "opened audio output");
        Ok(Self {
            format,
            depth,
            producer: Some(producer),
            consumer,
            carry: Vec::with_capacity(depth.bytes()),
            decoded: Vec::new(),
            shutdown: Some(shutdown_tx),
            device_thread: Some(device_thread),
        })
    }

    /// Samples waiting in the buffer
    pub fn queued_samples(&self) -> usize {
        self.producer
            .as_ref()
            .map_or(0, |producer| producer.occupied_len())
    }
}

impl Writer for CpalWriter {
    fn format(&self) -> Format {
        self.format
    }

    fn write_pcm(&mut self, buf: &[u8]) -> Result<usize, WriterError> {
        let producer = self.producer.as_mut().ok_or(WriterError::Closed)?;
        let width = self.depth.bytes();
        let mut rest = buf;
        self.decoded.clear();

        if !self.carry.is_empty() {
            let take = (width - self.carry.len()).min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() == width {
                self.decoded.push(decode_sample(&self.carry, self.depth));
                self.carry.clear();
            }
        }

        let whole = rest.len() / width * width;
        let depth = self.depth;
        self.decoded.extend(
            rest[..whole]
                .chunks_exact(width)
                .map(|bytes| decode_sample(bytes, depth)),
        );
        self.carry.extend_from_slice(&rest[whole..]);

        push_all(producer, &self.decoded)?;
        Ok(buf.len())
    }

    fn reset(&mut self) -> Result<(), WriterError> {
        if self.producer.is_none() {
            return Err(WriterError::Closed);
        }
        self.carry.clear();
        let dropped = lock(&self.consumer).clear();
        debug!(dropped, "reset audio output");
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        self.producer.take();
        self.shutdown.take();
        if let Some(handle) = self.device_thread.take() {
            handle
                .join()
                .map_err(|_| WriterError::Device("device thread panicked".to_string()))?;
            info!(format = %self.format, "closed audio output");
        }
        Ok(())
    }
}

impl Drop for CpalWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close audio output: {}", e);
        }
    }
}

fn lock(consumer: &SharedConsumer) -> MutexGuard<'_, HeapCons<f32>> {
    consumer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Push every sample, waiting while the ring is full. Fails once the ring
/// has not drained at all for `STALL_TIMEOUT`.
fn push_all(producer: &mut HeapProd<f32>, samples: &[f32]) -> Result<(), WriterError> {
    let mut pushed = 0;
    let mut last_progress = Instant::now();
    while pushed < samples.len() {
        let n = producer.push_slice(&samples[pushed..]);
        pushed += n;
        if pushed == samples.len() {
            break;
        }
        if n > 0 {
            last_progress = Instant::now();
        } else if last_progress.elapsed() >= STALL_TIMEOUT {
            return Err(WriterError::Device(
                "audio device stopped consuming samples".to_string(),
            ));
        }
        thread::sleep(FULL_POLL);
    }
    Ok(())
}

/// Convert one little-endian sample to `f32` in `[-1.0, 1.0)`.
pub(crate) fn decode_sample(bytes: &[u8], depth: BitDepth) -> f32 {
    match depth {
        BitDepth::Eight => bytes[0] as i8 as f32 / 128.0,
        BitDepth::Sixteen => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32_768.0,
        BitDepth::ThirtyTwo => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / 2_147_483_648.0
        }
    }
}

/// Fill a device buffer from the ring, padding with silence.
fn fill_from(consumer: &SharedConsumer, data: &mut [f32]) {
    // Real-time thread: never wait on the lock.
    let popped = match consumer.try_lock() {
        Ok(mut ring) => ring.pop_slice(data),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().pop_slice(data),
        Err(TryLockError::WouldBlock) => 0,
    };
    data[popped..].fill(0.0);
}

/// Whether the device can play `format` as `f32` through `range`
fn supports(range: &SupportedStreamConfigRange, format: &Format) -> bool {
    let rate = SampleRate(format.sample_rate);
    range.sample_format() == SampleFormat::F32
        && range.channels() == format.channels
        && range.min_sample_rate() <= rate
        && rate <= range.max_sample_rate()
}

/// Body of the device thread: build the stream, report the result, then
/// keep the stream alive until the writer lets go of `shutdown`.
fn run_device(
    format: Format,
    consumer: SharedConsumer,
    shutdown: Receiver<()>,
    ready: Sender<Result<(), WriterError>>,
) {
    let stream = match build_stream(format, consumer) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    // Returns once the writer drops its end.
    let _ = shutdown.recv();
    if let Err(e) = stream.pause() {
        debug!("failed to pause stream on shutdown: {}", e);
    }
}

fn build_stream(format: Format, consumer: SharedConsumer) -> Result<cpal::Stream, WriterError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(WriterError::NoDevice)?;

    let mut configs = device.supported_output_configs().map_err(|e| match e {
        cpal::SupportedStreamConfigsError::DeviceNotAvailable => WriterError::NoDevice,
        other => WriterError::SupportedConfigs(other),
    })?;
    if !configs.any(|range| supports(&range, &format)) {
        return Err(WriterError::unsupported(
            format,
            "default device has no f32 output config with this rate and channel count",
        ));
    }

    let config = StreamConfig {
        channels: format.channels,
        sample_rate: SampleRate(format.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| fill_from(&consumer, data),
            |err| warn!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => WriterError::NoDevice,
            cpal::BuildStreamError::StreamConfigNotSupported => {
                WriterError::unsupported(format, "stream config rejected by device")
            }
            other => WriterError::BuildStream(other),
        })?;
    stream.play()?;

    Ok(stream)
}
