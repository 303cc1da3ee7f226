//! Two-stage video playback state machine.
//!
//! Stages only move forward (`Home -> Intro -> Loop`); the only way back to
//! `Home` is a session reset. The `Intro -> Loop` handoff needs two
//! independent conditions: the intro clip must finish, and the loop clip
//! must have buffered a fixed lookahead so it can start without a visible
//! gap. A readiness poll establishes the second condition and retires
//! itself; a watcher task combines both, so an intro that ends early defers
//! the handoff instead of dropping it.

pub mod media;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::{TickFlow, TickTask};
use crate::events::EngineEvent;
use crate::{log_info, log_warn};

pub use media::{ClipRole, MediaClip, PlaybackError};

const ENABLE_LOGS: bool = true;

/// Seconds of loop-clip media that must be buffered before the intro clip
/// is allowed to hand off.
pub const LOOP_BUFFER_LOOKAHEAD_SECS: f64 = 5.0;

/// Readiness poll cadence; the animation-frame equivalent.
const BUFFER_POLL_INTERVAL_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStage {
    #[default]
    Home,
    Intro,
    Loop,
}

struct HandoffWatcher {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

pub struct PlaybackStageMachine {
    intro: Arc<dyn MediaClip>,
    loop_clip: Arc<dyn MediaClip>,
    stage: Arc<watch::Sender<PlaybackStage>>,
    events: broadcast::Sender<EngineEvent>,
    buffer_poll: Option<TickTask>,
    watcher: Option<HandoffWatcher>,
}

impl PlaybackStageMachine {
    pub fn new(
        intro: Arc<dyn MediaClip>,
        loop_clip: Arc<dyn MediaClip>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let (stage, _) = watch::channel(PlaybackStage::Home);
        Self {
            intro,
            loop_clip,
            stage: Arc::new(stage),
            events,
            buffer_poll: None,
            watcher: None,
        }
    }

    pub fn stage(&self) -> PlaybackStage {
        *self.stage.borrow()
    }

    /// `Home -> Intro`, synchronously with session start. Begins intro
    /// playback and arms the readiness poll plus the handoff watcher.
    pub fn start(&mut self) {
        self.cancel_handoff_tasks();

        self.set_stage(PlaybackStage::Intro);
        if let Err(err) = self.intro.play() {
            self.report_stalled(ClipRole::Intro, err);
        }

        // Condition 1: the loop clip has buffered enough lookahead. The
        // poll retires itself once satisfied.
        let (ready_tx, ready_rx) =
            watch::channel(self.loop_clip.buffered_end_secs() >= LOOP_BUFFER_LOOKAHEAD_SECS);
        let ready_tx = Arc::new(ready_tx);
        let loop_clip = Arc::clone(&self.loop_clip);
        self.buffer_poll = Some(TickTask::spawn(
            Duration::from_millis(BUFFER_POLL_INTERVAL_MS),
            move || {
                let loop_clip = Arc::clone(&loop_clip);
                let ready_tx = Arc::clone(&ready_tx);
                async move {
                    if loop_clip.buffered_end_secs() >= LOOP_BUFFER_LOOKAHEAD_SECS {
                        let _ = ready_tx.send(true);
                        TickFlow::Stop
                    } else {
                        TickFlow::Continue
                    }
                }
            },
        ));

        // Condition 2: intro playback ended. The watcher owns the handoff.
        let token = CancellationToken::new();
        let handle = tokio::spawn(handoff_watch(
            self.intro.ended(),
            ready_rx,
            Arc::clone(&self.loop_clip),
            Arc::clone(&self.stage),
            self.events.clone(),
            token.clone(),
        ));
        self.watcher = Some(HandoffWatcher {
            token,
            _handle: handle,
        });
    }

    /// Pause whichever clip is on screen. `Home` has no engine-owned clip.
    pub fn pause_active(&self) {
        match self.stage() {
            PlaybackStage::Intro => self.intro.pause(),
            PlaybackStage::Loop => self.loop_clip.pause(),
            PlaybackStage::Home => {}
        }
    }

    /// Resume the active clip from where it left off.
    pub fn resume_active(&self) {
        let (clip, role) = match self.stage() {
            PlaybackStage::Intro => (&self.intro, ClipRole::Intro),
            PlaybackStage::Loop => (&self.loop_clip, ClipRole::Loop),
            PlaybackStage::Home => return,
        };
        if let Err(err) = clip.play() {
            self.report_stalled(role, err);
        }
    }

    /// Session over: stop playback but keep the stage for the end screen.
    pub fn end_session(&mut self) {
        self.cancel_handoff_tasks();
        self.intro.pause();
        self.loop_clip.pause();
    }

    /// Return home: rewind both clips and clear any pending handoff.
    pub fn reset(&mut self) {
        self.cancel_handoff_tasks();
        self.intro.pause();
        self.loop_clip.pause();
        self.intro.seek_to_secs(0.0);
        self.loop_clip.seek_to_secs(0.0);
        self.set_stage(PlaybackStage::Home);
    }

    fn cancel_handoff_tasks(&mut self) {
        if let Some(poll) = self.buffer_poll.take() {
            poll.cancel();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.token.cancel();
        }
    }

    fn set_stage(&self, stage: PlaybackStage) {
        if self.stage.send_replace(stage) != stage {
            let _ = self.events.send(EngineEvent::StageChanged {
                stage,
                at: Utc::now(),
            });
        }
    }

    fn report_stalled(&self, clip: ClipRole, err: PlaybackError) {
        log_warn!("{clip} clip rejected play(): {err}");
        let _ = self.events.send(EngineEvent::PlaybackStalled {
            clip,
            message: err.message,
            at: Utc::now(),
        });
    }
}

/// Waits for both handoff conditions, in either arrival order, then swaps
/// the clips. Cancelled by stage reset or session end.
async fn handoff_watch(
    mut ended_rx: watch::Receiver<bool>,
    mut ready_rx: watch::Receiver<bool>,
    loop_clip: Arc<dyn MediaClip>,
    stage: Arc<watch::Sender<PlaybackStage>>,
    events: broadcast::Sender<EngineEvent>,
    token: CancellationToken,
) {
    let both_conditions = async {
        while !*ended_rx.borrow_and_update() {
            if ended_rx.changed().await.is_err() {
                log_info!("intro ended-signal closed before completion; abandoning handoff");
                return false;
            }
        }
        while !*ready_rx.borrow_and_update() {
            if ready_rx.changed().await.is_err() {
                log_info!("buffer poll retired without readiness; abandoning handoff");
                return false;
            }
        }
        true
    };

    tokio::select! {
        proceed = both_conditions => {
            if !proceed {
                return;
            }
            loop_clip.seek_to_secs(0.0);
            if let Err(err) = loop_clip.play() {
                // Stage still advances: video health never gates the session.
                log_warn!("loop clip rejected play(): {err}");
                let _ = events.send(EngineEvent::PlaybackStalled {
                    clip: ClipRole::Loop,
                    message: err.message,
                    at: Utc::now(),
                });
            }
            if stage.send_replace(PlaybackStage::Loop) != PlaybackStage::Loop {
                let _ = events.send(EngineEvent::StageChanged {
                    stage: PlaybackStage::Loop,
                    at: Utc::now(),
                });
            }
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scriptable clip: buffered end and ended-signal are driven by the test.
    pub(crate) struct FakeClip {
        pub plays: AtomicU32,
        pub pauses: AtomicU32,
        pub position: Mutex<f64>,
        pub buffered: Mutex<f64>,
        pub ended_tx: watch::Sender<bool>,
        pub fail_play: bool,
    }

    impl FakeClip {
        pub fn new() -> Self {
            let (ended_tx, _) = watch::channel(false);
            Self {
                plays: AtomicU32::new(0),
                pauses: AtomicU32::new(0),
                position: Mutex::new(0.0),
                buffered: Mutex::new(0.0),
                ended_tx,
                fail_play: false,
            }
        }

        pub fn set_buffered(&self, secs: f64) {
            *self.buffered.lock().unwrap() = secs;
        }

        pub fn finish_playback(&self) {
            let _ = self.ended_tx.send(true);
        }
    }

    impl MediaClip for FakeClip {
        fn play(&self) -> Result<(), PlaybackError> {
            if self.fail_play {
                return Err(PlaybackError::new("decoder unavailable"));
            }
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn seek_to_secs(&self, position_secs: f64) {
            *self.position.lock().unwrap() = position_secs;
        }

        fn buffered_end_secs(&self) -> f64 {
            *self.buffered.lock().unwrap()
        }

        fn ended(&self) -> watch::Receiver<bool> {
            self.ended_tx.subscribe()
        }
    }

    fn machine_with_clips() -> (PlaybackStageMachine, Arc<FakeClip>, Arc<FakeClip>) {
        let intro = Arc::new(FakeClip::new());
        let loop_clip = Arc::new(FakeClip::new());
        let (events, _) = broadcast::channel(16);
        let machine = PlaybackStageMachine::new(
            Arc::clone(&intro) as Arc<dyn MediaClip>,
            Arc::clone(&loop_clip) as Arc<dyn MediaClip>,
            events,
        );
        (machine, intro, loop_clip)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_advances_home_to_intro_and_plays() {
        let (mut machine, intro, _) = machine_with_clips();
        assert_eq!(machine.stage(), PlaybackStage::Home);
        machine.start();
        assert_eq!(machine.stage(), PlaybackStage::Intro);
        assert_eq!(intro.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handoff_waits_for_buffer_then_intro_end() {
        let (mut machine, intro, loop_clip) = machine_with_clips();
        machine.start();

        loop_clip.set_buffered(LOOP_BUFFER_LOOKAHEAD_SECS + 1.0);
        settle().await;
        // Buffer ready but intro still playing: no handoff yet.
        assert_eq!(machine.stage(), PlaybackStage::Intro);

        intro.finish_playback();
        settle().await;
        assert_eq!(machine.stage(), PlaybackStage::Loop);
        assert_eq!(*loop_clip.position.lock().unwrap(), 0.0);
        assert_eq!(loop_clip.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn intro_ending_before_buffer_defers_handoff() {
        let (mut machine, intro, loop_clip) = machine_with_clips();
        machine.start();

        intro.finish_playback();
        settle().await;
        // Intro done but loop not buffered: handoff deferred, not dropped.
        assert_eq!(machine.stage(), PlaybackStage::Intro);

        loop_clip.set_buffered(LOOP_BUFFER_LOOKAHEAD_SECS + 0.5);
        settle().await;
        assert_eq!(machine.stage(), PlaybackStage::Loop);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rewinds_both_clips_and_returns_home() {
        let (mut machine, intro, loop_clip) = machine_with_clips();
        machine.start();
        loop_clip.set_buffered(10.0);
        intro.finish_playback();
        settle().await;
        assert_eq!(machine.stage(), PlaybackStage::Loop);

        *intro.position.lock().unwrap() = 12.0;
        *loop_clip.position.lock().unwrap() = 3.0;
        machine.reset();
        assert_eq!(machine.stage(), PlaybackStage::Home);
        assert_eq!(*intro.position.lock().unwrap(), 0.0);
        assert_eq!(*loop_clip.position.lock().unwrap(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handoff_never_fires_after_reset() {
        let (mut machine, intro, loop_clip) = machine_with_clips();
        machine.start();
        machine.reset();

        // Conditions arrive after reset; the stage must stay Home.
        loop_clip.set_buffered(10.0);
        intro.finish_playback();
        settle().await;
        assert_eq!(machine.stage(), PlaybackStage::Home);
        assert_eq!(loop_clip.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn play_failure_is_nonfatal_and_reported() {
        let intro = Arc::new(FakeClip {
            fail_play: true,
            ..FakeClip::new()
        });
        let loop_clip = Arc::new(FakeClip::new());
        let (events, mut events_rx) = broadcast::channel(16);
        let mut machine = PlaybackStageMachine::new(
            Arc::clone(&intro) as Arc<dyn MediaClip>,
            Arc::clone(&loop_clip) as Arc<dyn MediaClip>,
            events,
        );

        machine.start();
        assert_eq!(machine.stage(), PlaybackStage::Intro);

        let mut saw_stall = false;
        while let Ok(event) = events_rx.try_recv() {
            if matches!(
                event,
                EngineEvent::PlaybackStalled {
                    clip: ClipRole::Intro,
                    ..
                }
            ) {
                saw_stall = true;
            }
        }
        assert!(saw_stall);
    }
}
