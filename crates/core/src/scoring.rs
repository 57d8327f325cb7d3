//! Scoring module - line-clear points, levels and gravity speed
//!
//! Clearing `k` full-cube rows in a single commit scores
//! `k * POINTS_PER_LINE * k`, so multi-row clears are worth far more than the
//! same rows cleared one at a time.

use crate::types::{DROP_STEP_MS, LINES_PER_LEVEL, MIN_DROP_MS, POINTS_PER_LINE, START_DROP_MS};

/// Score for clearing `lines` rows in one commit
pub fn line_clear_score(lines: u32) -> u32 {
    lines
        .saturating_mul(POINTS_PER_LINE)
        .saturating_mul(lines)
}

/// Level for a running total of cleared rows (starts at 1)
pub fn level_for_lines(total_lines: u32) -> u32 {
    total_lines / LINES_PER_LEVEL + 1
}

/// Gravity interval for a level, clamped at `MIN_DROP_MS`
pub fn drop_interval_ms(level: u32) -> u32 {
    let speedup = level.saturating_sub(1).saturating_mul(DROP_STEP_MS);
    START_DROP_MS.saturating_sub(speedup).max(MIN_DROP_MS)
}
