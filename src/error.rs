//! Engine error taxonomy.
//!
//! Every variant is recoverable: configuration problems keep the session in
//! `Idle`, playback and store failures are downgraded to logged events. No
//! error from a sub-component crosses the controller boundary.

use thiserror::Error;

use crate::playback::ClipRole;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The configured session duration was zero. The session stays `Idle`.
    #[error("invalid configuration: total duration must be greater than zero")]
    InvalidConfiguration,

    /// A media handle rejected a playback command. Non-fatal: timers and
    /// scoring continue with video stalled.
    #[error("playback failure on {clip} clip: {message}")]
    Playback { clip: ClipRole, message: String },

    /// The persisted high-score store could not be read or written. Reads
    /// degrade to "no high score recorded"; writes are dropped.
    #[error("high-score store unavailable: {0}")]
    Store(String),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
