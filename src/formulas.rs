//! Pure scoring formulas. Every XP or level number in the crate is computed
//! here; nothing in this module touches storage or the clock.

use crate::constants::{
    MAX_PENALTY_POINTS, PENALTY_REDUCTION_FLOOR, PENALTY_REDUCTION_STEP, PLAYER_LEVEL_XP_DIVISOR,
    STAT_LEVEL_CAP, STREAK_MULTIPLIER_CAP, STREAK_MULTIPLIER_STEP, XP_PER_STAT_LEVEL,
};

/// XP multiplier earned by a streak: `1.0 + streak * 0.1`, capped at 2.0.
/// Monotonic non-decreasing; saturates at a 10-day streak.
pub fn multiplier(streak: i32) -> f64 {
    (1.0 + streak as f64 * STREAK_MULTIPLIER_STEP).min(STREAK_MULTIPLIER_CAP)
}

/// XP reduction from accumulated penalty points: `1.0 - points * 0.05`,
/// floored at 0.5. The floor holds even for out-of-range inputs above
/// [`MAX_PENALTY_POINTS`].
pub fn penalty_reduction(penalty_points: i32) -> f64 {
    (1.0 - penalty_points as f64 * PENALTY_REDUCTION_STEP).max(PENALTY_REDUCTION_FLOOR)
}

/// Effective XP for a completion: base reward scaled by the streak
/// multiplier and the penalty reduction.
///
/// Rounds to the nearest integer with ties away from zero (`f64::round`),
/// so a raw value of 22.5 awards 23.
pub fn effective_xp(base_xp: i64, streak: i32, penalty_points: i32) -> i64 {
    (base_xp as f64 * multiplier(streak) * penalty_reduction(penalty_points)).round() as i64
}

/// Stat level for a given stat XP: one level per 100 XP, starting at level 1
/// and capped at 100. Stat levels are never stored; call this wherever one
/// is needed.
pub fn stat_level_for_xp(xp: i64) -> i32 {
    ((xp / XP_PER_STAT_LEVEL) as i32 + 1).min(STAT_LEVEL_CAP)
}

/// Player level for a given total XP: `floor(sqrt(total / 50)) + 1`.
pub fn player_level_for_xp(total_xp: i64) -> i32 {
    (total_xp as f64 / PLAYER_LEVEL_XP_DIVISOR).sqrt().floor() as i32 + 1
}

/// Clamp penalty points into their legal `[0, 10]` range before persisting.
pub fn clamp_penalty_points(points: i32) -> i32 {
    points.clamp(0, MAX_PENALTY_POINTS)
}
