//! PCM audio streaming and playback.
//!
//! Decoded audio flows through a chain of [`pcm::Reader`]s (cached bytes,
//! loops, fades) into a platform [`audio::Writer`]. [`playback::play`] paces
//! that copy in real time, staying a fixed margin ahead of the device.
//!
//! ```no_run
//! use std::time::Duration;
//! use pcm_stream::audio::{default_factory, Writer};
//! use pcm_stream::core::Format;
//! use pcm_stream::pcm::{fade_in, BytesReader, LoopingReader};
//! use pcm_stream::playback::{play, cancel_pair, PlayOptions};
//!
//! let format = Format::new(44100, 2, 16);
//! let sound = BytesReader::new(format, vec![0; 176_400]);
//! let mut reader = fade_in(Duration::from_millis(250), LoopingReader::new(sound));
//! let mut writer = default_factory(Duration::from_millis(500)).open(format)?;
//! let (_canceller, cancel) = cancel_pair();
//! play(&mut writer, &mut reader, &PlayOptions::default(), &cancel)?;
//! writer.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod pcm;
pub mod audio;
pub mod playback;
pub mod config;

pub use crate::core::{BitDepth, Format};
pub use crate::pcm::{Reader, ReadStatus};
pub use crate::audio::{Writer, WriterError, WriterFactory};
pub use crate::playback::{play, PlayError, PlayOptions, PlayOutcome};
