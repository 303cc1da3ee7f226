//! Session controller: the façade that owns every timer and enforces every
//! invariant.
//!
//! Commands come in, an immutable snapshot goes out. Sub-components never
//! talk to each other; the controller wires them and is the only writer of
//! the session aggregate. Each periodic cadence has exactly one `TickTask`
//! slot, and spawning into a slot cancels whatever was there, so
//! pause/resume cycles can never stack tick streams. Stale callbacks that
//! were already in flight when a slot was cancelled re-check the phase
//! under the state lock and drop themselves.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::clock::{TickFlow, TickTask};
use crate::countdown::{CountdownState, TickOutcome};
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::playback::{MediaClip, PlaybackStageMachine};
use crate::score::SCORE_TICK_MS;
use crate::store::HighScoreStore;
use crate::visibility::VisibilityTracker;
use crate::{log_error, log_info, log_warn};

use super::state::{SessionConfig, SessionPhase, SessionState};

const ENABLE_LOGS: bool = true;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    config: Arc<Mutex<SessionConfig>>,
    high_score: Arc<Mutex<u64>>,
    store: Arc<dyn HighScoreStore>,
    countdown_ticker: Arc<Mutex<Option<TickTask>>>,
    score_ticker: Arc<Mutex<Option<TickTask>>>,
    visibility: Arc<Mutex<VisibilityTracker>>,
    playback: Arc<Mutex<PlaybackStageMachine>>,
    foreground: watch::Receiver<bool>,
    events: broadcast::Sender<EngineEvent>,
}

impl SessionController {
    /// Wire the engine to its host capabilities. The high score is read
    /// once here; a failed read degrades to "none recorded yet".
    pub fn new(
        foreground: watch::Receiver<bool>,
        intro: Arc<dyn MediaClip>,
        loop_clip: Arc<dyn MediaClip>,
        store: Arc<dyn HighScoreStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let high_score = match store.load() {
            Ok(value) => value,
            Err(err) => {
                log_warn!("high-score read failed, starting from zero: {err}");
                0
            }
        };

        let is_foreground = *foreground.borrow();

        Self {
            state: Arc::new(Mutex::new(SessionState::new(is_foreground))),
            config: Arc::new(Mutex::new(SessionConfig::default())),
            high_score: Arc::new(Mutex::new(high_score)),
            store,
            countdown_ticker: Arc::new(Mutex::new(None)),
            score_ticker: Arc::new(Mutex::new(None)),
            visibility: Arc::new(Mutex::new(VisibilityTracker::new())),
            playback: Arc::new(Mutex::new(PlaybackStageMachine::new(
                intro,
                loop_clip,
                events.clone(),
            ))),
            foreground,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Read-only snapshot of the session, with the playback stage mirror
    /// refreshed.
    pub async fn snapshot(&self) -> SessionState {
        let stage = self.playback.lock().await.stage();
        let mut state = self.state.lock().await.clone();
        state.playback_stage = stage;
        state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn high_score(&self) -> u64 {
        *self.high_score.lock().await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Store the operator's duration input, clamped per field. Ignored
    /// while a session is active; the configuration is immutable then.
    pub async fn configure(&self, hours: u32, minutes: u32, seconds: u32) -> SessionState {
        {
            let state = self.state.lock().await;
            if matches!(state.phase, SessionPhase::Running | SessionPhase::Paused) {
                log_warn!("configure ignored while a session is active");
                drop(state);
                return self.snapshot().await;
            }
        }
        *self.config.lock().await = SessionConfig::from_fields(hours, minutes, seconds);
        self.snapshot().await
    }

    /// Begin a session. A zero total keeps the session `Idle`, silently.
    pub async fn start(&self) -> SessionState {
        let total = self.config.lock().await.total_duration_seconds();
        let started_at = Utc::now();
        let session_id = Uuid::new_v4();

        {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Idle {
                log_warn!("start ignored: session not idle");
                drop(state);
                return self.snapshot().await;
            }
            let Some(countdown) = CountdownState::arm(total) else {
                log_info!("{}", EngineError::InvalidConfiguration);
                drop(state);
                return self.snapshot().await;
            };
            let is_foreground = *self.foreground.borrow();
            state.begin_session(session_id, countdown, started_at, is_foreground, Instant::now());
        }

        // Everything the session owns is armed before the command returns.
        self.spawn_countdown_ticker().await;
        self.spawn_score_ticker().await;
        self.visibility.lock().await.start(
            self.foreground.clone(),
            Arc::clone(&self.state),
            self.events.clone(),
        );
        self.playback.lock().await.start();

        log_info!("session {session_id} started for {total}s");
        let _ = self.events.send(EngineEvent::SessionStarted {
            session_id,
            total_seconds: total,
            at: started_at,
        });

        self.snapshot().await
    }

    /// Suspend the countdown, the score ticker and the active clip in one
    /// step. Only valid from `Running`.
    pub async fn pause(&self) -> SessionState {
        {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Running {
                log_warn!("pause ignored: session not running");
                drop(state);
                return self.snapshot().await;
            }
            state.phase = SessionPhase::Paused;
        }

        self.cancel_tickers().await;
        self.playback.lock().await.pause_active();

        let remaining = self.state.lock().await.remaining_seconds;
        let _ = self.events.send(EngineEvent::SessionPaused {
            remaining_seconds: remaining,
            at: Utc::now(),
        });

        self.snapshot().await
    }

    /// Resume from `Paused`. Ticker slots are replaced, never stacked, so
    /// repeated pause/resume cycles keep exactly one stream per cadence.
    pub async fn resume(&self) -> SessionState {
        {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Paused {
                log_warn!("resume ignored: session not paused");
                drop(state);
                return self.snapshot().await;
            }
            state.phase = SessionPhase::Running;
        }

        self.spawn_countdown_ticker().await;
        self.spawn_score_ticker().await;
        self.playback.lock().await.resume_active();

        let remaining = self.state.lock().await.remaining_seconds;
        let _ = self.events.send(EngineEvent::SessionResumed {
            remaining_seconds: remaining,
            at: Utc::now(),
        });

        self.snapshot().await
    }

    /// End the session now. Called by the user's quit action; countdown
    /// expiry takes the same path internally.
    pub async fn end(&self) -> SessionState {
        let should_complete = {
            let mut state = self.state.lock().await;
            match state.phase {
                SessionPhase::Running | SessionPhase::Paused => {
                    state.phase = SessionPhase::Ended;
                    true
                }
                _ => {
                    log_warn!("end ignored: no active session");
                    false
                }
            }
        };

        if should_complete {
            self.complete_session().await;
        }
        self.snapshot().await
    }

    /// Return home: fresh `Idle` state, counters and distraction totals
    /// zeroed, clips rewound. Valid from any phase.
    pub async fn reset(&self) -> SessionState {
        self.cancel_tickers().await;
        if let Err(err) = self.visibility.lock().await.stop().await {
            log_error!("{err:#}");
        }
        self.playback.lock().await.reset();

        {
            let mut state = self.state.lock().await;
            *state = SessionState::new(*self.foreground.borrow());
        }

        let _ = self.events.send(EngineEvent::SessionReset { at: Utc::now() });
        self.snapshot().await
    }

    /// Reset and immediately run again with the retained configuration.
    pub async fn restart(&self) -> SessionState {
        self.reset().await;
        self.start().await
    }

    // ── Tick handling ────────────────────────────────────────────────

    async fn on_countdown_tick(&self) -> TickFlow {
        let expired = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Running {
                return TickFlow::Stop;
            }
            match state.countdown.tick_down() {
                TickOutcome::Expired => {
                    state.sync_countdown();
                    // The tick that reaches zero also flips the phase, under
                    // the same lock guard: no snapshot can observe zero
                    // remaining while still Running.
                    state.phase = SessionPhase::Ended;
                    true
                }
                TickOutcome::Running { .. } => {
                    state.sync_countdown();
                    false
                }
                TickOutcome::Spent => return TickFlow::Stop,
            }
        };

        if expired {
            self.complete_session().await;
            TickFlow::Stop
        } else {
            TickFlow::Continue
        }
    }

    async fn on_score_tick(&self) -> TickFlow {
        let mut state = self.state.lock().await;
        if state.phase != SessionPhase::Running {
            return TickFlow::Stop;
        }
        state.score = state.score_state.tick();
        TickFlow::Continue
    }

    /// Shut down everything the session owns, then commit the result.
    /// Reached exactly once per session: the phase gate in `end()` and the
    /// expiry path both flip `Ended` under the state lock first.
    async fn complete_session(&self) {
        self.cancel_tickers().await;
        if let Err(err) = self.visibility.lock().await.stop().await {
            log_error!("{err:#}");
        }
        self.playback.lock().await.end_session();

        let (session_id, score) = {
            let state = self.state.lock().await;
            (state.session_id.unwrap_or_else(Uuid::nil), state.score)
        };

        let mut high_score = self.high_score.lock().await;
        let new_high_score = score > *high_score;
        if new_high_score {
            *high_score = score;
            if let Err(err) = self.store.save(score) {
                log_warn!("high-score write dropped: {err}");
            }
        }

        log_info!("session {session_id} ended with score {score}");
        let _ = self.events.send(EngineEvent::SessionEnded {
            session_id,
            score,
            high_score: *high_score,
            new_high_score,
            at: Utc::now(),
        });
    }

    // ── Ticker ownership ─────────────────────────────────────────────

    async fn spawn_countdown_ticker(&self) {
        let mut slot = self.countdown_ticker.lock().await;
        if let Some(existing) = slot.take() {
            existing.cancel();
        }
        let controller = self.clone();
        *slot = Some(TickTask::spawn(Duration::from_secs(1), move || {
            let controller = controller.clone();
            async move { controller.on_countdown_tick().await }
        }));
    }

    async fn spawn_score_ticker(&self) {
        let mut slot = self.score_ticker.lock().await;
        if let Some(existing) = slot.take() {
            existing.cancel();
        }
        let controller = self.clone();
        *slot = Some(TickTask::spawn(
            Duration::from_millis(SCORE_TICK_MS),
            move || {
                let controller = controller.clone();
                async move { controller.on_score_tick().await }
            },
        ));
    }

    async fn cancel_tickers(&self) {
        if let Some(task) = self.countdown_ticker.lock().await.take() {
            task.cancel();
        }
        if let Some(task) = self.score_ticker.lock().await.take() {
            task.cancel();
        }
    }
}
