//! Score accumulator core.
//!
//! A fixed 90 ms cadence, far finer than the countdown's 1 s tick. The
//! controller owns the ticker and keeps it in lockstep with the countdown:
//! paused together, resumed together, never double-scheduled.

use serde::{Deserialize, Serialize};

/// Milliseconds between score increments.
pub const SCORE_TICK_MS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreState {
    value: u64,
}

impl ScoreState {
    pub fn tick(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate_and_reset_clears() {
        let mut score = ScoreState::default();
        for _ in 0..55 {
            score.tick();
        }
        assert_eq!(score.value(), 55);
        score.reset();
        assert_eq!(score.value(), 0);
    }
}
