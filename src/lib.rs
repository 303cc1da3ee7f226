//! # FocusReel
//!
//! Session & playback timing engine for focus-tracking widgets: measure a
//! bounded session of user attention, detect when the user looks away, and
//! drive a deterministic presentation (countdown, score, two-clip video
//! crossfade) from that measurement.
//!
//! ## Architecture
//!
//! - [`SessionController`]: the façade. Owns the session aggregate and every
//!   periodic task; commands in, immutable [`SessionState`] snapshots out.
//! - [`clock::TickTask`]: the single scheduling primitive (periodic callback
//!   with idempotent cancellation) behind the 1 s countdown tick, the 90 ms
//!   score tick and the buffer-readiness poll.
//! - [`playback::PlaybackStageMachine`]: sequences the intro and loop clips
//!   (`Home -> Intro -> Loop`) behind a buffer-readiness gate.
//! - Host capabilities are injected: a `watch::Receiver<bool>` foreground
//!   signal, two [`MediaClip`] handles, and a [`HighScoreStore`].
//!
//! Consumers poll [`SessionController::snapshot`] or subscribe to
//! [`EngineEvent`]s; nothing inside the engine renders or persists anything
//! beyond the high-score scalar.

pub mod clock;
pub mod countdown;
pub mod error;
pub mod events;
pub mod playback;
pub mod score;
pub mod session;
pub mod store;
pub mod utils;
pub mod visibility;

pub use error::EngineError;
pub use events::{EngineEvent, WELCOME_BACK_DISPLAY_SECS};
pub use playback::{
    ClipRole, MediaClip, PlaybackError, PlaybackStage, LOOP_BUFFER_LOOKAHEAD_SECS,
};
pub use score::SCORE_TICK_MS;
pub use session::{SessionConfig, SessionController, SessionPhase, SessionState, WelcomeBackNotice};
pub use store::{HighScoreStore, JsonHighScoreStore, MemoryHighScoreStore};
