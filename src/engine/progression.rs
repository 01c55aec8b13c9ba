//! The progression ledger: applies a quest completion to stat XP, total XP,
//! the day's history entry, and (at the maintenance threshold) the streak.

use tracing::{debug, instrument};

use crate::constants::STREAK_MAINTENANCE_PCT;
use crate::database::models::{
    ProfilePatch, Quest, QuestId, QuestPatch, StatKind, StatsPatch, StreakHistoryEntry, UserId,
};
use crate::database::Store;
use crate::error::{EngineError, Entity};
use crate::formulas;

use super::Engine;

/// What a completion did. Returned for every call, including the no-op on a
/// quest that was already completed.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// The quest in its post-completion state.
    pub quest: Quest,
    pub stat: StatKind,
    pub base_xp: i64,
    /// XP actually awarded; zero when `already_completed`.
    pub effective_xp: i64,
    pub multiplier_applied: bool,
    pub penalty_applied: bool,
    pub streak_advanced: bool,
    /// The quest had been completed before this call; nothing changed.
    pub already_completed: bool,
}

impl<S: Store> Engine<S> {
    /// Completes a quest and applies its XP. Effective XP is computed from
    /// the streak and penalty points read *before* any mutation, so a
    /// completion never benefits from the streak advance it triggers.
    ///
    /// Completing an already-completed quest awards nothing and returns the
    /// stored quest with `already_completed` set.
    #[instrument(skip(self, reflection))]
    pub async fn complete_quest(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        reflection: Option<String>,
    ) -> Result<CompletionResult, EngineError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut quest = self
            .store()
            .get_quest(quest_id)
            .await?
            .filter(|q| q.user_id == user_id)
            .ok_or(EngineError::NotFound(Entity::Quest))?;

        if quest.is_completed {
            debug!(target: "engine.progress", user_id, %quest_id, "quest already completed");
            return Ok(CompletionResult {
                stat: quest.stat,
                base_xp: quest.xp_reward,
                effective_xp: 0,
                multiplier_applied: false,
                penalty_applied: false,
                streak_advanced: false,
                already_completed: true,
                quest,
            });
        }

        let profile = self
            .store()
            .get_profile(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Profile))?;
        let streak = profile.current_streak;
        let penalty_points = profile.penalty_points;
        let effective_xp = formulas::effective_xp(quest.xp_reward, streak, penalty_points);

        // Stat XP; the stat's level is derived from XP wherever it is read.
        let stats = self
            .store()
            .get_stats(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Stats))?;
        let new_stat_xp = stats.xp_for(quest.stat) + effective_xp;
        self.store()
            .update_stats(user_id, StatsPatch::set(quest.stat, new_stat_xp))
            .await?;

        // Total XP and the level derived from it.
        let new_total_xp = profile.total_xp + effective_xp;
        self.store()
            .update_profile(
                user_id,
                ProfilePatch {
                    total_xp: Some(new_total_xp),
                    player_level: Some(formulas::player_level_for_xp(new_total_xp)),
                    ..Default::default()
                },
            )
            .await?;

        // Mark the quest itself.
        let completed_at = self.clock().now_utc();
        self.store()
            .update_quest(
                quest_id,
                QuestPatch {
                    is_completed: Some(true),
                    completed_at: Some(completed_at),
                    reflection: reflection.clone(),
                },
            )
            .await?;
        quest.is_completed = true;
        quest.completed_at = Some(completed_at);
        quest.reflection = reflection;

        // Recompute today's completion percentage from a fresh read of the
        // full quest set, never from a cached count.
        let today = self.clock().today();
        let todays_quests = self.store().get_quests(user_id, today).await?;
        let total = todays_quests.len() as i32;
        let completed = todays_quests.iter().filter(|q| q.is_completed).count() as i32;
        let completion_percentage = if total > 0 {
            f64::from(completed) / f64::from(total) * 100.0
        } else {
            0.0
        };
        let maintained = completion_percentage >= STREAK_MAINTENANCE_PCT;

        let prior_bonus = self
            .store()
            .get_history(user_id, today, today)
            .await?
            .into_iter()
            .next()
            .map(|h| h.bonus_xp_earned)
            .unwrap_or(0);
        self.store()
            .upsert_history(&StreakHistoryEntry {
                user_id,
                date: today,
                quests_completed: completed,
                quests_total: total,
                completion_percentage,
                streak_maintained: maintained,
                xp_multiplier: formulas::multiplier(streak),
                bonus_xp_earned: prior_bonus + (effective_xp - quest.xp_reward),
            })
            .await?;

        // Advance the streak only the first time today crosses the
        // threshold; last_quest_date is the once-per-day guard.
        let mut streak_advanced = false;
        if maintained && profile.last_quest_date != Some(today) {
            self.advance_streak(&profile, today).await?;
            streak_advanced = true;
        }

        debug!(
            target: "engine.progress",
            user_id,
            %quest_id,
            effective_xp,
            completion = completion_percentage,
            streak_advanced,
            "quest completed"
        );
        Ok(CompletionResult {
            stat: quest.stat,
            base_xp: quest.xp_reward,
            effective_xp,
            multiplier_applied: effective_xp > quest.xp_reward,
            penalty_applied: penalty_points > 0,
            streak_advanced,
            already_completed: false,
            quest,
        })
    }
}
