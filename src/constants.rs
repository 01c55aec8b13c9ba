// Central constants for game balance and thresholds.
pub const XP_PER_STAT_LEVEL: i64 = 100; // one stat level per 100 XP
pub const STAT_LEVEL_CAP: i32 = 100;
pub const PLAYER_LEVEL_XP_DIVISOR: f64 = 50.0; // player level = floor(sqrt(total/50)) + 1

pub const STREAK_MULTIPLIER_STEP: f64 = 0.1; // +10% XP per streak day
pub const STREAK_MULTIPLIER_CAP: f64 = 2.0; // saturates at a 10-day streak
pub const PENALTY_REDUCTION_STEP: f64 = 0.05; // -5% XP per penalty point
pub const PENALTY_REDUCTION_FLOOR: f64 = 0.5; // saturates at 10 penalty points
pub const MAX_PENALTY_POINTS: i32 = 10;

// A day counts as maintained once this share of its quests is completed.
pub const STREAK_MAINTENANCE_PCT: f64 = 80.0;
pub const MANDATORY_QUEST_SLOTS: usize = 4; // one quest per lowest-leveled stat
pub const REDEEM_STREAK_DAYS: i32 = 7; // streak length that unlocks penalty redemption
pub const AT_RISK_HOUR: u32 = 20; // local hour after which an unmaintained day is "at risk"
pub const HISTORY_WINDOW_DAYS: u64 = 7;
