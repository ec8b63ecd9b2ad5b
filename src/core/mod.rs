//! Core types shared by every stage of the pipeline.
//!
//! `Format` describes a PCM byte stream; `time` converts between byte counts
//! and wall-clock durations for a given format.

pub mod format;
pub mod time;

pub use format::{BitDepth, Format, FormatError};
pub use time::{bytes_for, duration_of};
