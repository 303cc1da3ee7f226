//! Display formatting for the HUD layer.
//!
//! The widgets render the countdown as `hh:mm:ss` (or `mm:ss` for short
//! sessions) and the score as a six-digit, zero-padded arcade counter with a
//! fixed display multiplier.

/// Points multiplier applied for display only; the engine's internal score
/// is the raw tick count.
pub const SCORE_DISPLAY_MULTIPLIER: u64 = 5;

const SCORE_DISPLAY_DIGITS: usize = 6;

/// Format whole seconds as `hh:mm:ss`.
pub fn format_clock(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format whole seconds as `mm:ss`. Minutes are not capped at 59, so an
/// 90-minute value reads `90:00`.
pub fn format_clock_short(total_seconds: u32) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Format a raw score as the six-digit HUD counter, keeping the last six
/// digits when the multiplied value overflows the display.
pub fn format_score(score: u64) -> String {
    let displayed = score.saturating_mul(SCORE_DISPLAY_MULTIPLIER);
    let padded = format!("{displayed:0width$}", width = SCORE_DISPLAY_DIGITS);
    padded[padded.len() - SCORE_DISPLAY_DIGITS..].to_string()
}
