//! Outbound engine events.
//!
//! Consumers that need more than snapshot polling subscribe through
//! [`crate::session::SessionController::subscribe`]; every state change that
//! a widget reacts to (toasts, end screens, clip swaps) has an event here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::playback::{ClipRole, PlaybackStage};

/// Seconds the welcome-back notice stays visible before the engine clears
/// it from the snapshot.
pub const WELCOME_BACK_DISPLAY_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum EngineEvent {
    SessionStarted {
        session_id: Uuid,
        total_seconds: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_seconds: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_seconds: u32,
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per session, whether the countdown expired or
    /// the user quit early.
    SessionEnded {
        session_id: Uuid,
        score: u64,
        high_score: u64,
        new_high_score: bool,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// The user came back from a distraction episode. The consuming layer
    /// shows this for `display_secs`; the engine clears the snapshot copy on
    /// the same schedule.
    WelcomeBack {
        away_seconds: u32,
        display_secs: u64,
        at: DateTime<Utc>,
    },
    StageChanged {
        stage: PlaybackStage,
        at: DateTime<Utc>,
    },
    /// A media handle rejected `play()`. Non-fatal: the session keeps
    /// running with video stalled.
    PlaybackStalled {
        clip: ClipRole,
        message: String,
        at: DateTime<Utc>,
    },
}
