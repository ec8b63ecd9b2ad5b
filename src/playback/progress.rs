//! Lock-free progress published by a running playback.
//!
//! The playback thread is the only writer; any thread may read. Relaxed
//! ordering is enough since the fields are independent counters.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use crate::core::format::Format;
use crate::core::time::duration_of;
use crate::playback::state::PlayState;

/// Shared view of a playback's state and how much audio it has written
#[derive(Debug, Default)]
pub struct Progress {
    state: AtomicU8,
    bytes_written: AtomicU64,
    /// Writer format packed by [`pack_format`]; 0 until priming starts
    format: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayState {
        PlayState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Total bytes handed to the writer
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Format being played, once priming has started
    pub fn format(&self) -> Option<Format> {
        unpack_format(self.format.load(Ordering::Relaxed))
    }

    /// Audio time handed to the writer. Runs ahead of what is audible by
    /// the chase margin.
    pub fn written_duration(&self) -> Duration {
        match self.format() {
            Some(format) => duration_of(&format, self.bytes_written()),
            None => Duration::ZERO,
        }
    }

    pub(crate) fn begin(&self, format: &Format) {
        self.bytes_written.store(0, Ordering::Relaxed);
        self.format.store(pack_format(format), Ordering::Relaxed);
    }

    pub(crate) fn set_state(&self, state: PlayState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub(crate) fn add_written(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// `sample_rate | channels | bits`, 32/16/16 bits
fn pack_format(format: &Format) -> u64 {
    (format.sample_rate as u64) << 32 | (format.channels as u64) << 16 | format.bits as u64
}

fn unpack_format(packed: u64) -> Option<Format> {
    if packed == 0 {
        return None;
    }
    Some(Format::new(
        (packed >> 32) as u32,
        (packed >> 16) as u16,
        packed as u16,
    ))
}
