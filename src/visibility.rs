//! Foreground/background distraction tracking.
//!
//! The host supplies a `watch::Receiver<bool>` (true = the page is in the
//! foreground). A pure transition core turns edges into completed
//! distraction episodes; a worker task folds them into the session state
//! and raises the welcome-back notice. Duplicate signals of the same value
//! are no-ops by construction.
//!
//! Tracking deliberately ignores the countdown's pause state: the engine
//! measures attention to the page, not to a running timer. The worker is
//! alive for the whole of Running and Paused and stopped on end/reset.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::events::{EngineEvent, WELCOME_BACK_DISPLAY_SECS};
use crate::session::{SessionPhase, SessionState, WelcomeBackNotice};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// A finished away-interval, produced on the background -> foreground edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedEpisode {
    pub away_seconds: u32,
}

/// Pure edge-detection core. Monotonic anchors; durations rounded to the
/// nearest second.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityState {
    is_foreground: bool,
    open_episode: Option<Instant>,
}

impl VisibilityState {
    /// Start tracking from the host's current foreground value. Beginning a
    /// session while already backgrounded opens an episode immediately.
    pub fn new(is_foreground: bool, now: Instant) -> Self {
        Self {
            is_foreground,
            open_episode: (!is_foreground).then_some(now),
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.is_foreground
    }

    /// Apply one signal. Equal-value signals are ignored; only the
    /// background -> foreground edge completes an episode.
    pub fn observe(&mut self, foreground: bool, now: Instant) -> Option<CompletedEpisode> {
        if foreground == self.is_foreground {
            return None;
        }
        self.is_foreground = foreground;

        if foreground {
            let started_at = self.open_episode.take()?;
            let away_ms = now.duration_since(started_at).as_millis();
            let away_seconds = ((away_ms + 500) / 1000) as u32;
            Some(CompletedEpisode { away_seconds })
        } else {
            self.open_episode = Some(now);
            None
        }
    }
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            is_foreground: true,
            open_episode: None,
        }
    }
}

/// Owns the worker task consuming the host signal for one session.
pub struct VisibilityTracker {
    handle: Option<JoinHandle<()>>,
    token: Option<CancellationToken>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self {
            handle: None,
            token: None,
        }
    }

    pub fn start(
        &mut self,
        signal: watch::Receiver<bool>,
        state: Arc<Mutex<SessionState>>,
        events: broadcast::Sender<EngineEvent>,
    ) {
        if self.handle.is_some() {
            log_warn!("visibility tracker already active; keeping the existing worker");
            return;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(visibility_loop(signal, state, events, token.clone()));
        self.handle = Some(handle);
        self.token = Some(token);
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("visibility worker failed to join")?;
        }
        Ok(())
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

async fn visibility_loop(
    mut signal: watch::Receiver<bool>,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<EngineEvent>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            changed = signal.changed() => {
                if changed.is_err() {
                    log_info!("foreground signal closed; visibility tracking stops");
                    break;
                }
                let foreground = *signal.borrow_and_update();
                apply_signal(&state, &events, foreground, Instant::now(), &token).await;
            }
            _ = token.cancelled() => break,
        }
    }
}

async fn apply_signal(
    state: &Arc<Mutex<SessionState>>,
    events: &broadcast::Sender<EngineEvent>,
    foreground: bool,
    now: Instant,
    token: &CancellationToken,
) {
    let mut session = state.lock().await;
    if !matches!(session.phase, SessionPhase::Running | SessionPhase::Paused) {
        return;
    }

    let completed = session.visibility.observe(foreground, now);
    session.is_foreground = session.visibility.is_foreground();

    let Some(episode) = completed else {
        return;
    };

    session.distraction_count += 1;
    session.total_distraction_seconds += episode.away_seconds;
    session.last_distraction_seconds = episode.away_seconds;
    session.notice_seq += 1;
    session.welcome_back = Some(WelcomeBackNotice {
        away_seconds: episode.away_seconds,
    });
    let notice_seq = session.notice_seq;
    drop(session);

    log_info!(
        "distraction episode completed: away {}s",
        episode.away_seconds
    );
    let _ = events.send(EngineEvent::WelcomeBack {
        away_seconds: episode.away_seconds,
        display_secs: WELCOME_BACK_DISPLAY_SECS,
        at: Utc::now(),
    });

    // The notice dismisses itself after the fixed display window, unless a
    // newer episode replaced it or the session shut the tracker down.
    let state = Arc::clone(state);
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(WELCOME_BACK_DISPLAY_SECS)) => {
                let mut session = state.lock().await;
                if session.notice_seq == notice_seq {
                    session.welcome_back = None;
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Instant {
        Instant::now()
    }

    #[tokio::test]
    async fn duplicate_signals_are_noops() {
        let mut vis = VisibilityState::new(true, now());
        assert!(vis.observe(true, now()).is_none());
        assert!(vis.observe(true, now()).is_none());
        assert!(vis.is_foreground());

        assert!(vis.observe(false, now()).is_none());
        assert!(vis.observe(false, now()).is_none());
        assert!(!vis.is_foreground());
    }

    #[tokio::test(start_paused = true)]
    async fn episode_duration_rounds_to_nearest_second() {
        let mut vis = VisibilityState::new(true, now());
        let start = now();
        assert!(vis.observe(false, start).is_none());

        tokio::time::advance(Duration::from_millis(7_400)).await;
        let episode = vis.observe(true, now()).unwrap();
        assert_eq!(episode.away_seconds, 7);

        let start = now();
        vis.observe(false, start);
        tokio::time::advance(Duration::from_millis(2_600)).await;
        let episode = vis.observe(true, now()).unwrap();
        assert_eq!(episode.away_seconds, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_backgrounded_opens_an_episode() {
        let start = now();
        let mut vis = VisibilityState::new(false, start);
        assert!(!vis.is_foreground());

        tokio::time::advance(Duration::from_secs(4)).await;
        let episode = vis.observe(true, now()).unwrap();
        assert_eq!(episode.away_seconds, 4);
    }

    #[tokio::test]
    async fn foreground_edge_without_open_episode_is_ignored() {
        let mut vis = VisibilityState {
            is_foreground: false,
            open_episode: None,
        };
        assert!(vis.observe(true, now()).is_none());
        assert!(vis.is_foreground());
    }
}
