//! Session configuration and the mutable session aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::countdown::CountdownState;
use crate::playback::PlaybackStage;
use crate::score::ScoreState;
use crate::visibility::VisibilityState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Ended,
}

/// Operator-facing duration input. Each field is clamped to its valid
/// domain independently before combination; immutable once a session is
/// running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    total_duration_seconds: u32,
}

impl SessionConfig {
    const MAX_HOURS: u32 = 99;
    const MAX_MINUTES: u32 = 59;
    const MAX_SECONDS: u32 = 59;

    pub fn from_fields(hours: u32, minutes: u32, seconds: u32) -> Self {
        let hours = hours.min(Self::MAX_HOURS);
        let minutes = minutes.min(Self::MAX_MINUTES);
        let seconds = seconds.min(Self::MAX_SECONDS);
        Self {
            total_duration_seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    pub fn total_duration_seconds(&self) -> u32 {
        self.total_duration_seconds
    }
}

/// Welcome-back notice, held in the snapshot for the fixed display window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeBackNotice {
    pub away_seconds: u32,
}

/// The controller's mutable aggregate; a clone of this is the snapshot
/// consumers render from. Internal component cores are not serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub score: u64,
    pub is_foreground: bool,
    pub distraction_count: u32,
    pub total_distraction_seconds: u32,
    pub last_distraction_seconds: u32,
    pub welcome_back: Option<WelcomeBackNotice>,
    /// Mirror of the stage machine, refreshed when a snapshot is taken.
    pub playback_stage: PlaybackStage,

    #[serde(skip)]
    pub(crate) countdown: CountdownState,
    #[serde(skip)]
    pub(crate) score_state: ScoreState,
    #[serde(skip)]
    pub(crate) visibility: VisibilityState,
    #[serde(skip)]
    pub(crate) notice_seq: u64,
}

impl SessionState {
    pub fn new(is_foreground: bool) -> Self {
        Self {
            phase: SessionPhase::Idle,
            session_id: None,
            started_at: None,
            total_seconds: 0,
            remaining_seconds: 0,
            score: 0,
            is_foreground,
            distraction_count: 0,
            total_distraction_seconds: 0,
            last_distraction_seconds: 0,
            welcome_back: None,
            playback_stage: PlaybackStage::Home,
            countdown: CountdownState::default(),
            score_state: ScoreState::default(),
            visibility: VisibilityState::default(),
            notice_seq: 0,
        }
    }

    /// Replace everything with a fresh running session.
    pub(crate) fn begin_session(
        &mut self,
        session_id: Uuid,
        countdown: CountdownState,
        started_at: DateTime<Utc>,
        is_foreground: bool,
        now: Instant,
    ) {
        *self = Self {
            phase: SessionPhase::Running,
            session_id: Some(session_id),
            started_at: Some(started_at),
            total_seconds: countdown.total_seconds(),
            remaining_seconds: countdown.remaining_seconds(),
            score: 0,
            is_foreground,
            distraction_count: 0,
            total_distraction_seconds: 0,
            last_distraction_seconds: 0,
            welcome_back: None,
            playback_stage: PlaybackStage::Home,
            countdown,
            score_state: ScoreState::default(),
            visibility: VisibilityState::new(is_foreground, now),
            notice_seq: 0,
        };
    }

    /// Refresh the public countdown mirror after a tick.
    pub(crate) fn sync_countdown(&mut self) {
        self.remaining_seconds = self.countdown.remaining_seconds();
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.total_seconds - self.remaining_seconds
    }

    /// Share of the elapsed session spent in the foreground, 0–100.
    /// An untouched session reads as fully focused.
    pub fn focus_rate_percent(&self) -> u8 {
        let elapsed = self.elapsed_seconds();
        if elapsed == 0 {
            return 100;
        }
        let focused = elapsed.saturating_sub(self.total_distraction_seconds);
        let rate = (focused * 100 + elapsed / 2) / elapsed;
        rate.min(100) as u8
    }
}
