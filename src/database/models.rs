//! Contains the data structures that map to stored records or operation
//! results, plus the patch structs used for partial updates.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::formulas;

pub type UserId = i64;
pub type QuestId = Uuid;

/// The seven trackable stat categories. Declaration order is the tie-break
/// order when quest selection sorts stats by level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatKind {
    Strength,
    Agility,
    Vitality,
    Intelligence,
    Discipline,
    Charisma,
    Wealth,
}

impl StatKind {
    pub const ALL: [StatKind; 7] = [
        StatKind::Strength,
        StatKind::Agility,
        StatKind::Vitality,
        StatKind::Intelligence,
        StatKind::Discipline,
        StatKind::Charisma,
        StatKind::Wealth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatKind::Strength => "strength",
            StatKind::Agility => "agility",
            StatKind::Vitality => "vitality",
            StatKind::Intelligence => "intelligence",
            StatKind::Discipline => "discipline",
            StatKind::Charisma => "charisma",
            StatKind::Wealth => "wealth",
        }
    }

    /// Parses the stored text form. Returns `None` for unknown names.
    pub fn parse(raw: &str) -> Option<StatKind> {
        StatKind::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's progression profile. One row per user; mutated only by the
/// progression and streak operations.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: UserId,
    pub total_xp: i64,
    pub player_level: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    /// Clamped to `[0, MAX_PENALTY_POINTS]` by every writer.
    pub penalty_points: i32,
    pub streak_freeze_available: i32,
    pub last_quest_date: Option<NaiveDate>,
    pub last_penalty_date: Option<NaiveDate>,
}

impl Profile {
    /// A fresh level-1 profile with no streak, penalties, or freezes.
    pub fn new(user_id: UserId) -> Self {
        Profile {
            user_id,
            total_xp: 0,
            player_level: 1,
            current_streak: 0,
            longest_streak: 0,
            penalty_points: 0,
            streak_freeze_available: 0,
            last_quest_date: None,
            last_penalty_date: None,
        }
    }
}

/// Per-stat XP for one user. Levels are never stored: they are always
/// derived from XP through [`formulas::stat_level_for_xp`].
#[derive(Debug, Clone, Default)]
pub struct PlayerStats {
    pub user_id: UserId,
    pub xp: BTreeMap<StatKind, i64>,
}

impl PlayerStats {
    pub fn new(user_id: UserId) -> Self {
        PlayerStats {
            user_id,
            xp: StatKind::ALL.into_iter().map(|s| (s, 0)).collect(),
        }
    }

    pub fn xp_for(&self, stat: StatKind) -> i64 {
        self.xp.get(&stat).copied().unwrap_or(0)
    }

    pub fn level_for(&self, stat: StatKind) -> i32 {
        formulas::stat_level_for_xp(self.xp_for(stat))
    }
}

/// A reusable quest definition in the catalog.
#[derive(Debug, Clone)]
pub struct QuestTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub stat: StatKind,
    pub xp_reward: i64,
    pub is_active: bool,
}

/// One assigned quest for one user on one calendar day. Immutable after
/// completion except for the reflection captured at completion time.
#[derive(Debug, Clone)]
pub struct Quest {
    pub id: QuestId,
    pub user_id: UserId,
    pub template_id: Uuid,
    pub quest_date: NaiveDate,
    pub title: String,
    pub description: String,
    pub stat: StatKind,
    pub xp_reward: i64,
    pub is_mandatory: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub reflection: Option<String>,
}

/// Daily completion summary, upserted keyed by (user, date).
#[derive(Debug, Clone)]
pub struct StreakHistoryEntry {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub quests_completed: i32,
    pub quests_total: i32,
    pub completion_percentage: f64,
    pub streak_maintained: bool,
    /// Multiplier in force when the entry was last written.
    pub xp_multiplier: f64,
    /// Net effective-minus-base XP accumulated across the day's completions.
    pub bonus_xp_earned: i64,
}

// --- Partial updates -------------------------------------------------------
// `None` always means "leave unchanged"; no field is ever cleared back to
// NULL through a patch.

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub total_xp: Option<i64>,
    pub player_level: Option<i32>,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub penalty_points: Option<i32>,
    pub streak_freeze_available: Option<i32>,
    pub last_quest_date: Option<NaiveDate>,
    pub last_penalty_date: Option<NaiveDate>,
}

impl ProfilePatch {
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = self.total_xp {
            profile.total_xp = v;
        }
        if let Some(v) = self.player_level {
            profile.player_level = v;
        }
        if let Some(v) = self.current_streak {
            profile.current_streak = v;
        }
        if let Some(v) = self.longest_streak {
            profile.longest_streak = v;
        }
        if let Some(v) = self.penalty_points {
            profile.penalty_points = v;
        }
        if let Some(v) = self.streak_freeze_available {
            profile.streak_freeze_available = v;
        }
        if let Some(v) = self.last_quest_date {
            profile.last_quest_date = Some(v);
        }
        if let Some(v) = self.last_penalty_date {
            profile.last_penalty_date = Some(v);
        }
    }
}

/// Absolute new XP values for the listed stats; unlisted stats are untouched.
#[derive(Debug, Clone, Default)]
pub struct StatsPatch {
    pub xp: BTreeMap<StatKind, i64>,
}

impl StatsPatch {
    pub fn set(stat: StatKind, xp: i64) -> Self {
        StatsPatch {
            xp: BTreeMap::from([(stat, xp)]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuestPatch {
    pub is_completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reflection: Option<String>,
}

impl QuestPatch {
    pub fn apply_to(&self, quest: &mut Quest) {
        if let Some(v) = self.is_completed {
            quest.is_completed = v;
        }
        if let Some(v) = self.completed_at {
            quest.completed_at = Some(v);
        }
        if let Some(v) = &self.reflection {
            quest.reflection = Some(v.clone());
        }
    }
}
