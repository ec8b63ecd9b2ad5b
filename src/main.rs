//! `pcm-stream`: play a headerless PCM file on the default output device.
//!
//! ```text
//! pcm-stream clip.raw --rate 44100 --channels 2 --bits 16 --fade-in-ms 200
//! pcm-stream loop.raw --loop --duration-ms 10000
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_stream::audio::{default_factory, MemoryFactory, MemoryWriter, WriterFactory};
use pcm_stream::config::Config;
use pcm_stream::core::time::format_duration;
use pcm_stream::core::Format;
use pcm_stream::pcm::{fade_in, fade_out, IoReader, LoopingReader, Reader};
use pcm_stream::playback::{PlayOutcome, Playback};

/// Command-line arguments for pcm-stream
#[derive(Parser, Debug)]
#[command(name = "pcm-stream")]
#[command(about = "Stream raw PCM audio to the default output device")]
#[command(version)]
struct Args {
    /// Headerless little-endian PCM file
    file: PathBuf,

    /// Sample rate in Hz
    #[arg(short, long, default_value = "44100")]
    rate: u32,

    /// Interleaved channel count
    #[arg(short, long, default_value = "2")]
    channels: u16,

    /// Sample width in bits (8, 16 or 32)
    #[arg(short, long, default_value = "16")]
    bits: u16,

    /// Replay the file forever (stop with --duration-ms)
    #[arg(long = "loop")]
    looping: bool,

    /// Fade in over this many milliseconds
    #[arg(long)]
    fade_in_ms: Option<u64>,

    /// Fade out over this many milliseconds, then stay silent
    #[arg(long)]
    fade_out_ms: Option<u64>,

    /// Stop playback after this many milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,

    /// TOML config file
    #[arg(long, env = "PCM_STREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Render into memory instead of opening an audio device
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // Initialize tracing
    let default_filter = config
        .log_filter
        .clone()
        .unwrap_or_else(|| "pcm_stream=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let format = Format::new(args.rate, args.channels, args.bits);
    format.validate().context("Invalid PCM format")?;
    if args.looping && args.duration_ms.is_none() {
        info!("Looping without --duration-ms; interrupt to stop");
    }

    let options = config.play_options()?;
    let factory: Arc<dyn WriterFactory> = if args.dry_run {
        Arc::new(MemoryFactory::new(MemoryWriter::new(format)))
    } else {
        default_factory(config.output_buffer()?)
    };

    let reader = build_reader(&args, format)?;
    info!("Playing {} as {}", args.file.display(), format);

    let started = Instant::now();
    let playback = Playback::spawn(factory, reader, options).context("Failed to start playback")?;

    let outcome = match args.duration_ms {
        Some(ms) if !playback.wait_timeout(Duration::from_millis(ms)) => playback.stop(),
        _ => playback.wait(),
    }
    .context("Playback failed")?;

    match outcome {
        PlayOutcome::Finished => info!("Finished after {}", format_duration(started.elapsed())),
        PlayOutcome::Cancelled => info!("Stopped after {}", format_duration(started.elapsed())),
    }
    Ok(())
}

/// File source, optionally looped, then faded
fn build_reader(args: &Args, format: Format) -> Result<Box<dyn Reader + Send>> {
    let source = IoReader::open(&args.file, format)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let empty = std::fs::metadata(&args.file)
        .map(|meta| meta.len() == 0)
        .unwrap_or(false);
    if args.looping && empty {
        bail!("Cannot loop an empty file");
    }

    let mut reader: Box<dyn Reader + Send> = if args.looping {
        Box::new(LoopingReader::new(source))
    } else {
        Box::new(source)
    };
    if let Some(ms) = args.fade_in_ms {
        reader = Box::new(fade_in(Duration::from_millis(ms), reader));
    }
    if let Some(ms) = args.fade_out_ms {
        reader = Box::new(fade_out(Duration::from_millis(ms), reader));
    }
    Ok(reader)
}
