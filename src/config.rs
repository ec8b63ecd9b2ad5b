//! TOML configuration for the `pcm-stream` binary.
//!
//! ```toml
//! log_filter = "pcm_stream=debug"
//!
//! [playback]
//! copy_increment_ms = 125
//! chase_increments = 2
//! allow_mismatched_formats = false
//! drain_on_end = true
//!
//! [output]
//! buffer_ms = 500
//! ```
//!
//! Every key is optional.

use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use crate::audio::cpal_writer::DEFAULT_BUFFER;
use crate::playback::options::{PlayOptions, DEFAULT_CHASE_INCREMENTS, DEFAULT_COPY_INCREMENT};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    pub playback: PlaybackConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub copy_increment_ms: u64,
    pub chase_increments: u32,
    pub allow_mismatched_formats: bool,
    pub drain_on_end: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            copy_increment_ms: DEFAULT_COPY_INCREMENT.as_millis() as u64,
            chase_increments: DEFAULT_CHASE_INCREMENTS,
            allow_mismatched_formats: false,
            drain_on_end: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Audio the platform sink buffers ahead of the device
    pub buffer_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            buffer_ms: DEFAULT_BUFFER.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.play_options()?;
        config.output_buffer()?;
        Ok(config)
    }

    /// Validated playback pacing
    pub fn play_options(&self) -> Result<PlayOptions, ConfigError> {
        let options = PlayOptions::new()
            .with_copy_increment(Duration::from_millis(self.playback.copy_increment_ms))
            .with_chase_increments(self.playback.chase_increments)
            .with_allow_mismatched_formats(self.playback.allow_mismatched_formats)
            .with_drain_on_end(self.playback.drain_on_end);
        options
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(options)
    }

    /// Sink buffer length; must cover the chase margin
    pub fn output_buffer(&self) -> Result<Duration, ConfigError> {
        let buffer = Duration::from_millis(self.output.buffer_ms);
        let margin = Duration::from_millis(self.playback.copy_increment_ms)
            * self.playback.chase_increments;
        if buffer < margin {
            return Err(ConfigError::Invalid(format!(
                "output buffer {:?} is shorter than the chase margin {:?}",
                buffer, margin
            )));
        }
        Ok(buffer)
    }
}
