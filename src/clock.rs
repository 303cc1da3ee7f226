//! The one scheduling primitive in the crate.
//!
//! Every periodic job (the 1 s countdown tick, the 90 ms score tick, the
//! buffer-readiness poll) runs as a [`TickTask`]. Nothing else in the
//! engine spawns its own interval loop, which is what makes "exactly one
//! live ticker per cadence" enforceable at the controller.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Returned by a tick callback to keep the task alive or retire it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// A cancellable periodic callback task.
///
/// The first tick fires one full period after spawn, not immediately.
/// Cancellation is idempotent; dropping the handle cancels the task.
pub struct TickTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TickTask {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if on_tick().await == TickFlow::Stop {
                            break;
                        }
                    }
                    _ = task_token.cancelled() => break,
                }
            }
        });

        Self { token, handle }
    }

    /// Stop the task. Safe to call any number of times; a second cancel is
    /// a no-op. A callback already in flight finishes, so state guarded by
    /// the session lock must re-check its own phase.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_tick_fires_one_period_after_spawn() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let _task = TickTask::spawn(Duration::from_millis(100), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }
        });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_stops_ticks() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let task = TickTask::spawn(Duration::from_millis(10), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }
        });

        time::sleep(Duration::from_millis(35)).await;
        task.cancel();
        task.cancel();

        let after_cancel = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_retire_the_task() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let task = TickTask::spawn(Duration::from_millis(10), move || {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    TickFlow::Stop
                } else {
                    TickFlow::Continue
                }
            }
        });

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(task.is_finished());
    }
}
