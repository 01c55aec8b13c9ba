//! Postgres `Store` backend. All queries go through the runtime API with
//! explicit binds; partial updates build their SET clause dynamically from
//! the patch, so untouched columns never appear in the statement.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;

use super::init::{ensure_schema, DbPool};
use super::models::{
    PlayerStats, Profile, ProfilePatch, Quest, QuestId, QuestPatch, QuestTemplate, StatKind,
    StatsPatch, StreakHistoryEntry, UserId,
};
use super::{Store, StoreError};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }

    /// Connects and bootstraps the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        ensure_schema(&pool).await?;
        Ok(PgStore::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn parse_stat(raw: &str) -> Result<StatKind, StoreError> {
    StatKind::parse(raw).ok_or_else(|| StoreError::Invalid(format!("unknown stat '{raw}'")))
}

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    Ok(Profile {
        user_id: row.try_get("user_id")?,
        total_xp: row.try_get("total_xp")?,
        player_level: row.try_get("player_level")?,
        current_streak: row.try_get("current_streak")?,
        longest_streak: row.try_get("longest_streak")?,
        penalty_points: row.try_get("penalty_points")?,
        streak_freeze_available: row.try_get("streak_freeze_available")?,
        last_quest_date: row.try_get("last_quest_date")?,
        last_penalty_date: row.try_get("last_penalty_date")?,
    })
}

fn quest_from_row(row: &PgRow) -> Result<Quest, StoreError> {
    let stat: String = row.try_get("stat")?;
    Ok(Quest {
        id: row.try_get("quest_id")?,
        user_id: row.try_get("user_id")?,
        template_id: row.try_get("template_id")?,
        quest_date: row.try_get("quest_date")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        stat: parse_stat(&stat)?,
        xp_reward: row.try_get("xp_reward")?,
        is_mandatory: row.try_get("is_mandatory")?,
        is_completed: row.try_get("is_completed")?,
        completed_at: row.try_get("completed_at")?,
        reflection: row.try_get("reflection")?,
    })
}

fn template_from_row(row: &PgRow) -> Result<QuestTemplate, StoreError> {
    let stat: String = row.try_get("stat")?;
    Ok(QuestTemplate {
        id: row.try_get("template_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        stat: parse_stat(&stat)?,
        xp_reward: row.try_get("xp_reward")?,
        is_active: row.try_get("is_active")?,
    })
}

fn history_from_row(row: &PgRow) -> Result<StreakHistoryEntry, StoreError> {
    Ok(StreakHistoryEntry {
        user_id: row.try_get("user_id")?,
        date: row.try_get("date")?,
        quests_completed: row.try_get("quests_completed")?,
        quests_total: row.try_get("quests_total")?,
        completion_percentage: row.try_get("completion_percentage")?,
        streak_maintained: row.try_get("streak_maintained")?,
        xp_multiplier: row.try_get("xp_multiplier")?,
        bonus_xp_earned: row.try_get("bonus_xp_earned")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, total_xp, player_level, current_streak, longest_streak,
                penalty_points, streak_freeze_available, last_quest_date, last_penalty_date
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        patch: ProfilePatch,
    ) -> Result<(), StoreError> {
        // Build the SET clause from the fields actually present.
        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;
        let mut push = |clauses: &mut Vec<String>, column: &str, present: bool| {
            if present {
                clauses.push(format!("{column} = ${idx}"));
                idx += 1;
            }
        };
        push(&mut sets, "total_xp", patch.total_xp.is_some());
        push(&mut sets, "player_level", patch.player_level.is_some());
        push(&mut sets, "current_streak", patch.current_streak.is_some());
        push(&mut sets, "longest_streak", patch.longest_streak.is_some());
        push(&mut sets, "penalty_points", patch.penalty_points.is_some());
        push(
            &mut sets,
            "streak_freeze_available",
            patch.streak_freeze_available.is_some(),
        );
        push(&mut sets, "last_quest_date", patch.last_quest_date.is_some());
        push(
            &mut sets,
            "last_penalty_date",
            patch.last_penalty_date.is_some(),
        );
        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE profiles SET {} WHERE user_id = ${}",
            sets.join(", "),
            idx
        );
        let mut query = sqlx::query(&sql);
        if let Some(v) = patch.total_xp {
            query = query.bind(v);
        }
        if let Some(v) = patch.player_level {
            query = query.bind(v);
        }
        if let Some(v) = patch.current_streak {
            query = query.bind(v);
        }
        if let Some(v) = patch.longest_streak {
            query = query.bind(v);
        }
        if let Some(v) = patch.penalty_points {
            query = query.bind(v);
        }
        if let Some(v) = patch.streak_freeze_available {
            query = query.bind(v);
        }
        if let Some(v) = patch.last_quest_date {
            query = query.bind(v);
        }
        if let Some(v) = patch.last_penalty_date {
            query = query.bind(v);
        }
        query.bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_stats(&self, user_id: UserId) -> Result<Option<PlayerStats>, StoreError> {
        // The profile row defines the user; stat rows are filled in lazily.
        let exists = sqlx::query("SELECT 1 FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query("SELECT stat, xp FROM player_stats WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        let mut stats = PlayerStats::new(user_id);
        for row in rows {
            let stat: String = row.try_get("stat")?;
            let xp: i64 = row.try_get("xp")?;
            stats.xp.insert(parse_stat(&stat)?, xp);
        }
        Ok(Some(stats))
    }

    async fn update_stats(&self, user_id: UserId, patch: StatsPatch) -> Result<(), StoreError> {
        for (stat, xp) in patch.xp {
            sqlx::query(
                "INSERT INTO player_stats (user_id, stat, xp) VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, stat) DO UPDATE SET xp = EXCLUDED.xp",
            )
            .bind(user_id)
            .bind(stat.as_str())
            .bind(xp)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn get_quests(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<Quest>, StoreError> {
        let rows = sqlx::query(
            "SELECT quest_id, user_id, template_id, quest_date, title, description, stat,
                xp_reward, is_mandatory, is_completed, completed_at, reflection
             FROM daily_quests WHERE user_id = $1 AND quest_date = $2
             ORDER BY is_mandatory DESC, created_at ASC",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(quest_from_row).collect()
    }

    async fn get_quest(&self, quest_id: QuestId) -> Result<Option<Quest>, StoreError> {
        let row = sqlx::query(
            "SELECT quest_id, user_id, template_id, quest_date, title, description, stat,
                xp_reward, is_mandatory, is_completed, completed_at, reflection
             FROM daily_quests WHERE quest_id = $1",
        )
        .bind(quest_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(quest_from_row).transpose()
    }

    #[instrument(skip(self, quests), fields(count = quests.len()))]
    async fn insert_quests(&self, quests: &[Quest]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for quest in quests {
            sqlx::query(
                "INSERT INTO daily_quests (quest_id, user_id, template_id, quest_date, title,
                    description, stat, xp_reward, is_mandatory, is_completed, completed_at,
                    reflection)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(quest.id)
            .bind(quest.user_id)
            .bind(quest.template_id)
            .bind(quest.quest_date)
            .bind(&quest.title)
            .bind(&quest.description)
            .bind(quest.stat.as_str())
            .bind(quest.xp_reward)
            .bind(quest.is_mandatory)
            .bind(quest.is_completed)
            .bind(quest.completed_at)
            .bind(&quest.reflection)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_quest(&self, quest_id: QuestId, patch: QuestPatch) -> Result<(), StoreError> {
        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;
        if patch.is_completed.is_some() {
            sets.push(format!("is_completed = ${idx}"));
            idx += 1;
        }
        if patch.completed_at.is_some() {
            sets.push(format!("completed_at = ${idx}"));
            idx += 1;
        }
        if patch.reflection.is_some() {
            sets.push(format!("reflection = ${idx}"));
            idx += 1;
        }
        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE daily_quests SET {} WHERE quest_id = ${}",
            sets.join(", "),
            idx
        );
        let mut query = sqlx::query(&sql);
        if let Some(v) = patch.is_completed {
            query = query.bind(v);
        }
        if let Some(v) = patch.completed_at {
            query = query.bind(v);
        }
        if let Some(v) = patch.reflection {
            query = query.bind(v);
        }
        query.bind(quest_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_active_templates(&self) -> Result<Vec<QuestTemplate>, StoreError> {
        let rows = sqlx::query(
            "SELECT template_id, title, description, stat, xp_reward, is_active
             FROM quest_templates WHERE is_active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(template_from_row).collect()
    }

    async fn get_history(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StreakHistoryEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, date, quests_completed, quests_total, completion_percentage,
                streak_maintained, xp_multiplier, bonus_xp_earned
             FROM streak_history WHERE user_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date DESC",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(history_from_row).collect()
    }

    #[instrument(skip(self, entry), fields(user_id = entry.user_id, date = %entry.date))]
    async fn upsert_history(&self, entry: &StreakHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO streak_history (user_id, date, quests_completed, quests_total,
                completion_percentage, streak_maintained, xp_multiplier, bonus_xp_earned)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (user_id, date) DO UPDATE SET
                quests_completed = EXCLUDED.quests_completed,
                quests_total = EXCLUDED.quests_total,
                completion_percentage = EXCLUDED.completion_percentage,
                streak_maintained = EXCLUDED.streak_maintained,
                xp_multiplier = EXCLUDED.xp_multiplier,
                bonus_xp_earned = EXCLUDED.bonus_xp_earned",
        )
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.quests_completed)
        .bind(entry.quests_total)
        .bind(entry.completion_percentage)
        .bind(entry.streak_maintained)
        .bind(entry.xp_multiplier)
        .bind(entry.bonus_xp_earned)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
