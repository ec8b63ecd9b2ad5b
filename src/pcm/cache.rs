//! Named cache of decoded sounds.
//! Lookups always hand out a fresh copy so concurrent playbacks never share
//! a read offset.

use std::collections::HashMap;
use std::io;
use tracing::debug;
use crate::pcm::bytes::{read_all, BytesReader};
use crate::pcm::reader::Reader;

/// Decoded audio kept in memory, keyed by name
#[derive(Default)]
pub struct SoundCache {
    entries: HashMap<String, BytesReader>,
}

impl SoundCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a finite reader and store it under `name`, replacing any
    /// previous entry.
    pub fn load<R: Reader + ?Sized>(&mut self, name: impl Into<String>, reader: &mut R) -> io::Result<()> {
        let name = name.into();
        let cached = read_all(reader)?;
        debug!(name = %name, bytes = cached.len(), format = %cached.format(), "cached sound");
        self.entries.insert(name, cached);
        Ok(())
    }

    /// Store an already-buffered sound
    pub fn insert(&mut self, name: impl Into<String>, mut reader: BytesReader) {
        reader.rewind();
        self.entries.insert(name.into(), reader);
    }

    /// A private copy of the cached sound, positioned at the start
    pub fn get(&self, name: &str) -> Option<BytesReader> {
        self.entries.get(name).map(BytesReader::copy)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<BytesReader> {
        self.entries.remove(name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
