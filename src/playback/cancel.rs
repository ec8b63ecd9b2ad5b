//! Cooperative cancellation for playback loops.
//!
//! Built on a crossbeam channel that never carries a message: cancelling
//! drops the only sender, and every clone of the signal sees the disconnect
//! at once. That makes the signal directly usable in `select!` next to a
//! ticker.

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

/// Create a linked canceller and signal
pub fn cancel_pair() -> (Canceller, CancelSignal) {
    let (tx, rx) = channel::bounded(0);
    (Canceller { _tx: tx }, CancelSignal { rx })
}

/// Requests cancellation. Dropping it has the same effect as [`cancel`](Canceller::cancel).
#[derive(Debug)]
pub struct Canceller {
    _tx: Sender<()>,
}

impl Canceller {
    pub fn cancel(self) {
        drop(self);
    }
}

/// Observed by the playback loop once per tick.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        Self {
            rx: channel::never(),
        }
    }

    /// Non-blocking check
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) on cancellation
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
