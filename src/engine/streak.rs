//! The streak/penalty state machine: advance on maintained days, penalize
//! (or spend a freeze) on missed ones, redeem penalties on long streaks.

use chrono::{Days, NaiveDate};
use tracing::{debug, instrument, warn};

use crate::constants::{AT_RISK_HOUR, HISTORY_WINDOW_DAYS, REDEEM_STREAK_DAYS};
use crate::database::models::{Profile, ProfilePatch, StreakHistoryEntry, UserId};
use crate::database::Store;
use crate::error::{EngineError, Entity};
use crate::formulas;

use super::Engine;

/// Streak summary for display: the profile counters, the derived formula
/// values, the last week of history (newest first), and the two day-state
/// flags.
#[derive(Debug, Clone)]
pub struct StreakInfo {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub multiplier: f64,
    pub penalty_points: i32,
    pub penalty_reduction: f64,
    pub streak_freeze_available: i32,
    pub weekly_history: Vec<StreakHistoryEntry>,
    pub is_at_risk: bool,
    pub today_completed: bool,
}

/// Outcome of a missed-day evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PenaltyOutcome {
    /// Yesterday has no history entry, or it was maintained.
    NoMissedDay,
    /// Yesterday was already evaluated; nothing changed.
    AlreadyEvaluated,
    /// A freeze credit absorbed the miss; the streak survives.
    FreezeConsumed { remaining: i32 },
    /// The streak reset and a penalty point was added.
    PenaltyApplied { penalty_points: i32, streak_lost: i32 },
}

/// Outcome of a penalty redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed { penalty_points: i32 },
    NotEligible,
}

impl<S: Store> Engine<S> {
    /// Read-only streak summary. The at-risk flag is derived from the local
    /// hour and carries no state transition.
    pub async fn streak_info(&self, user_id: UserId) -> Result<StreakInfo, EngineError> {
        let profile = self
            .store()
            .get_profile(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Profile))?;

        let today = self.clock().today();
        let from = today
            .checked_sub_days(Days::new(HISTORY_WINDOW_DAYS))
            .unwrap_or(today);
        let weekly_history = self.store().get_history(user_id, from, today).await?;

        let today_completed = weekly_history
            .iter()
            .find(|h| h.date == today)
            .map(|h| h.streak_maintained)
            .unwrap_or(false);
        let is_at_risk = self.clock().hour() >= AT_RISK_HOUR && !today_completed;

        Ok(StreakInfo {
            current_streak: profile.current_streak,
            longest_streak: profile.longest_streak,
            multiplier: formulas::multiplier(profile.current_streak),
            penalty_points: profile.penalty_points,
            penalty_reduction: formulas::penalty_reduction(profile.penalty_points),
            streak_freeze_available: profile.streak_freeze_available,
            weekly_history,
            is_at_risk,
            today_completed,
        })
    }

    /// Evaluates yesterday for a missed day. Triggered by client activity,
    /// not a timer, so it must be safe to run late, repeatedly, or not at
    /// all: it only ever looks at yesterday, and `last_penalty_date` makes
    /// re-runs no-ops. A skipped day defers the penalty without compounding.
    #[instrument(skip(self))]
    pub async fn evaluate_missed_day(&self, user_id: UserId) -> Result<PenaltyOutcome, EngineError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let today = self.clock().today();
        let Some(yesterday) = today.pred_opt() else {
            return Ok(PenaltyOutcome::NoMissedDay);
        };

        let profile = self
            .store()
            .get_profile(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Profile))?;
        let missed = self
            .store()
            .get_history(user_id, yesterday, yesterday)
            .await?
            .into_iter()
            .next()
            .is_some_and(|entry| !entry.streak_maintained);
        if !missed {
            return Ok(PenaltyOutcome::NoMissedDay);
        }
        if profile.last_penalty_date == Some(yesterday) {
            return Ok(PenaltyOutcome::AlreadyEvaluated);
        }

        if profile.streak_freeze_available > 0 {
            // The freeze branch stamps last_penalty_date too; otherwise a
            // second evaluation the same day would burn another credit.
            let remaining = profile.streak_freeze_available - 1;
            self.store()
                .update_profile(
                    user_id,
                    ProfilePatch {
                        streak_freeze_available: Some(remaining),
                        last_penalty_date: Some(yesterday),
                        ..Default::default()
                    },
                )
                .await?;
            debug!(target: "engine.streak", user_id, remaining, "freeze credit consumed");
            return Ok(PenaltyOutcome::FreezeConsumed { remaining });
        }

        let penalty_points = formulas::clamp_penalty_points(profile.penalty_points + 1);
        self.store()
            .update_profile(
                user_id,
                ProfilePatch {
                    current_streak: Some(0),
                    penalty_points: Some(penalty_points),
                    last_penalty_date: Some(yesterday),
                    ..Default::default()
                },
            )
            .await?;
        warn!(
            target: "engine.streak",
            user_id,
            penalty_points,
            streak_lost = profile.current_streak,
            "missed day penalty applied"
        );
        Ok(PenaltyOutcome::PenaltyApplied {
            penalty_points,
            streak_lost: profile.current_streak,
        })
    }

    /// Redeems one penalty point. Caller-invoked: eligible whenever the
    /// streak is at least seven days and points remain, removing a single
    /// point per call.
    #[instrument(skip(self))]
    pub async fn redeem_penalty_point(&self, user_id: UserId) -> Result<RedeemOutcome, EngineError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let profile = self
            .store()
            .get_profile(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Profile))?;
        if profile.current_streak < REDEEM_STREAK_DAYS || profile.penalty_points == 0 {
            return Ok(RedeemOutcome::NotEligible);
        }

        let penalty_points = profile.penalty_points - 1;
        self.store()
            .update_profile(
                user_id,
                ProfilePatch {
                    penalty_points: Some(penalty_points),
                    ..Default::default()
                },
            )
            .await?;
        debug!(target: "engine.streak", user_id, penalty_points, "penalty point redeemed");
        Ok(RedeemOutcome::Redeemed { penalty_points })
    }

    /// Bumps the streak for a newly maintained day and records the day so it
    /// cannot advance twice.
    pub(crate) async fn advance_streak(
        &self,
        profile: &Profile,
        today: NaiveDate,
    ) -> Result<i32, EngineError> {
        let new_streak = profile.current_streak + 1;
        self.store()
            .update_profile(
                profile.user_id,
                ProfilePatch {
                    current_streak: Some(new_streak),
                    longest_streak: Some(profile.longest_streak.max(new_streak)),
                    last_quest_date: Some(today),
                    ..Default::default()
                },
            )
            .await?;
        debug!(
            target: "engine.streak",
            user_id = profile.user_id,
            streak = new_streak,
            "streak advanced"
        );
        Ok(new_streak)
    }
}
