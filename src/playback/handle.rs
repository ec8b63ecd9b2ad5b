//! One playback per worker thread.
//! Each handle owns its writer for the whole run; sounds that play at the
//! same time each get their own handle and their own writer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use tracing::{debug, warn};
use crate::audio::writer::{Writer, WriterFactory};
use crate::core::format::Format;
use crate::pcm::reader::Reader;
use crate::playback::cancel::{cancel_pair, Canceller};
use crate::playback::options::PlayOptions;
use crate::playback::play::{play_with_progress, PlayError, PlayOutcome};
use crate::playback::progress::Progress;
use crate::playback::state::PlayState;

/// A playback running on its own thread
pub struct Playback {
    format: Format,
    canceller: Option<Canceller>,
    worker: Option<JoinHandle<Result<PlayOutcome, PlayError>>>,
    /// Disconnects when the worker exits
    done: Receiver<()>,
    progress: Arc<Progress>,
}

impl Playback {
    /// Open a writer for the reader's format through `factory` and play
    /// `reader` into it on a new thread. The writer is closed when the
    /// playback ends.
    pub fn spawn<R>(
        factory: Arc<dyn WriterFactory>,
        reader: R,
        options: PlayOptions,
    ) -> Result<Self, PlayError>
    where
        R: Reader + Send + 'static,
    {
        options.validate()?;
        let format = reader.format();
        let (canceller, cancel) = cancel_pair();
        let (done_tx, done_rx) = channel::bounded::<()>(0);
        let progress = Arc::new(Progress::new());
        let worker_progress = Arc::clone(&progress);

        let worker = thread::Builder::new()
            .name(format!("pcm-play-{}", format))
            .spawn(move || {
                let _done = done_tx;
                let mut reader = reader;
                let mut writer = match factory.open(format) {
                    Ok(writer) => writer,
                    Err(e) => {
                        worker_progress.set_state(PlayState::Failed);
                        return Err(PlayError::Open(e));
                    }
                };
                let result =
                    play_with_progress(&mut writer, &mut reader, &options, &cancel, &worker_progress);
                if let Err(e) = writer.close() {
                    warn!("failed to close writer: {}", e);
                }
                result
            })
            .map_err(PlayError::Spawn)?;

        debug!(%format, "spawned playback");
        Ok(Self {
            format,
            canceller: Some(canceller),
            worker: Some(worker),
            done: done_rx,
            progress,
        })
    }

    /// Format of the audio being played
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn state(&self) -> PlayState {
        self.progress.state()
    }

    /// Audio time handed to the writer so far
    pub fn written(&self) -> Duration {
        self.progress.written_duration()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |worker| worker.is_finished())
    }

    /// Wait up to `timeout` for the playback to end on its own.
    /// Returns `true` if it has ended.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(self.done.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// Cancel and wait for the worker to return. The in-flight chunk
    /// finishes writing first.
    pub fn stop(mut self) -> Result<PlayOutcome, PlayError> {
        if let Some(canceller) = self.canceller.take() {
            canceller.cancel();
        }
        self.join()
    }

    /// Wait for the playback to end on its own. Never returns for a reader
    /// that never ends.
    pub fn wait(mut self) -> Result<PlayOutcome, PlayError> {
        self.join()
    }

    fn join(&mut self) -> Result<PlayOutcome, PlayError> {
        match self.worker.take() {
            Some(worker) => worker.join().unwrap_or(Err(PlayError::WorkerPanicked)),
            None => Ok(PlayOutcome::Cancelled),
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        // Stop playback and clean up the worker
        self.canceller.take();
        if self.worker.is_some() {
            if let Err(e) = self.join() {
                warn!("playback ended with error: {}", e);
            }
        }
    }
}
