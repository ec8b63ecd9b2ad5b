pub mod play;
pub mod options;
pub mod cancel;
pub mod state;
pub mod progress;
pub mod handle;

pub use play::{play, play_with_progress, PlayError, PlayOutcome};
pub use options::PlayOptions;
pub use cancel::{cancel_pair, CancelSignal, Canceller};
pub use state::PlayState;
pub use progress::Progress;
pub use handle::Playback;
