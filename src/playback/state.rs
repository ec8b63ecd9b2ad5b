//! Playback state machine.
//!
//! ```text
//! Idle → Priming → Streaming → {Done | Cancelled | Failed}
//!           │          │
//!           └──────────┴──→ Draining → {Done | Cancelled}   (drain_on_end only)
//! ```
//!
//! `Priming` and `Streaming` may also go straight to `Done` on end-of-stream.

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayState {
    /// Not started yet
    Idle = 0,
    /// Writing the initial chase increments back to back
    Priming = 1,
    /// Copying one increment per tick
    Streaming = 2,
    /// Source ended; waiting for buffered audio to play out
    Draining = 3,
    /// Source ended and playback returned successfully
    Done = 4,
    /// Stopped by the cancel signal
    Cancelled = 5,
    /// Stopped by a read, write or configuration error
    Failed = 6,
}

impl PlayState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => PlayState::Priming,
            2 => PlayState::Streaming,
            3 => PlayState::Draining,
            4 => PlayState::Done,
            5 => PlayState::Cancelled,
            6 => PlayState::Failed,
            _ => PlayState::Idle,
        }
    }

    /// Check if the loop is still running
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlayState::Priming | PlayState::Streaming | PlayState::Draining
        )
    }

    /// Check if playback has returned
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlayState::Done | PlayState::Cancelled | PlayState::Failed
        )
    }
}
