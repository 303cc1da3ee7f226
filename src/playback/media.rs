//! Media playback capability.
//!
//! The engine never inspects decoder internals; the host hands it two
//! independently controllable clip handles and the engine only issues
//! commands and reads buffering progress. "Ended" is exposed as a watch
//! channel so the stage machine can combine it with the buffer-readiness
//! condition instead of wiring a listener off a side-channel poll.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Which of the two session clips a playback error or event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipRole {
    Intro,
    Loop,
}

impl fmt::Display for ClipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipRole::Intro => write!(f, "intro"),
            ClipRole::Loop => write!(f, "loop"),
        }
    }
}

/// A media handle rejected a command. Always non-fatal to the session.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlaybackError {
    pub message: String,
}

impl PlaybackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One controllable clip. Implementations wrap whatever the host plays
/// video with; positions are media seconds.
pub trait MediaClip: Send + Sync {
    fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn seek_to_secs(&self, position_secs: f64);

    /// End of the contiguous buffered range from the start of the clip.
    fn buffered_end_secs(&self) -> f64;

    /// Flips to true when playback reaches the end of the clip.
    fn ended(&self) -> watch::Receiver<bool>;
}
