//! Countdown core.
//!
//! Pure state: the 1 s ticker driving it is owned by the session controller
//! (`session/controller.rs`), which is what makes "at most one live
//! countdown ticker" enforceable across pause/resume cycles.

use serde::{Deserialize, Serialize};

/// Result of one 1-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Decremented; time still on the clock.
    Running { remaining_seconds: u32 },
    /// This tick hit zero. Reported exactly once per armed countdown.
    Expired,
    /// Tick arrived after expiry; nothing to do. The caller should have
    /// cancelled the ticker already.
    Spent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    total_seconds: u32,
    remaining_seconds: u32,
}

impl CountdownState {
    /// Arm for `total_seconds`. A zero duration is rejected: the session
    /// must stay `Idle` rather than start an already-expired countdown.
    pub fn arm(total_seconds: u32) -> Option<Self> {
        if total_seconds == 0 {
            return None;
        }
        Some(Self {
            total_seconds,
            remaining_seconds: total_seconds,
        })
    }

    pub fn tick_down(&mut self) -> TickOutcome {
        match self.remaining_seconds {
            0 => TickOutcome::Spent,
            1 => {
                self.remaining_seconds = 0;
                TickOutcome::Expired
            }
            n => {
                self.remaining_seconds = n - 1;
                TickOutcome::Running {
                    remaining_seconds: n - 1,
                }
            }
        }
    }

    /// Back to the armed total, clearing any progress.
    pub fn reset(&mut self) {
        self.remaining_seconds = self.total_seconds;
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.total_seconds - self.remaining_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_rejected() {
        assert!(CountdownState::arm(0).is_none());
    }

    #[test]
    fn ticks_down_to_expiry_exactly_once() {
        let mut countdown = CountdownState::arm(3).unwrap();
        assert_eq!(
            countdown.tick_down(),
            TickOutcome::Running {
                remaining_seconds: 2
            }
        );
        assert_eq!(
            countdown.tick_down(),
            TickOutcome::Running {
                remaining_seconds: 1
            }
        );
        assert_eq!(countdown.tick_down(), TickOutcome::Expired);
        // A stray tick after expiry must not re-report.
        assert_eq!(countdown.tick_down(), TickOutcome::Spent);
        assert_eq!(countdown.remaining_seconds(), 0);
    }

    #[test]
    fn reset_rearms_to_the_original_total() {
        let mut countdown = CountdownState::arm(10).unwrap();
        countdown.tick_down();
        countdown.tick_down();
        assert_eq!(countdown.elapsed_seconds(), 2);
        countdown.reset();
        assert_eq!(countdown.remaining_seconds(), 10);
        assert_eq!(countdown.elapsed_seconds(), 0);
    }
}
