pub mod writer;
pub mod cpal_writer;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

pub use writer::{Writer, WriterError, WriterFactory};
pub use cpal_writer::{CpalFactory, CpalWriter};
pub use memory::{MemoryFactory, MemoryWriter, Recording, SinkEvent};

/// The writer factory for the platform this binary was built for.
///
/// cpal selects the host backend (WASAPI, CoreAudio, ALSA, ...) at compile
/// time, so this is the single place a platform is chosen.
pub fn default_factory(buffer: Duration) -> Arc<dyn WriterFactory> {
    Arc::new(CpalFactory::with_buffer(buffer))
}
