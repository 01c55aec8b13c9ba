//! Shared database types and schema bootstrap for the Postgres backend.

use sqlx::{Pool, Postgres};

/// A type alias for the database connection pool (`Pool<Postgres>`).
pub type DbPool = Pool<Postgres>;

// Executed statement-by-statement; every statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS profiles (
        user_id BIGINT PRIMARY KEY,
        total_xp BIGINT NOT NULL DEFAULT 0,
        player_level INT NOT NULL DEFAULT 1,
        current_streak INT NOT NULL DEFAULT 0,
        longest_streak INT NOT NULL DEFAULT 0,
        penalty_points INT NOT NULL DEFAULT 0,
        streak_freeze_available INT NOT NULL DEFAULT 0,
        last_quest_date DATE,
        last_penalty_date DATE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS player_stats (
        user_id BIGINT NOT NULL,
        stat TEXT NOT NULL,
        xp BIGINT NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, stat)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS quest_templates (
        template_id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        stat TEXT NOT NULL,
        xp_reward BIGINT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS daily_quests (
        quest_id UUID PRIMARY KEY,
        user_id BIGINT NOT NULL,
        template_id UUID NOT NULL,
        quest_date DATE NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        stat TEXT NOT NULL,
        xp_reward BIGINT NOT NULL,
        is_mandatory BOOLEAN NOT NULL DEFAULT FALSE,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        completed_at TIMESTAMPTZ,
        reflection TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_daily_quests_user_date
        ON daily_quests (user_id, quest_date)"#,
    r#"CREATE TABLE IF NOT EXISTS streak_history (
        user_id BIGINT NOT NULL,
        date DATE NOT NULL,
        quests_completed INT NOT NULL DEFAULT 0,
        quests_total INT NOT NULL DEFAULT 0,
        completion_percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
        streak_maintained BOOLEAN NOT NULL DEFAULT FALSE,
        xp_multiplier DOUBLE PRECISION NOT NULL DEFAULT 1.0,
        bonus_xp_earned BIGINT NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, date)
    )"#,
];

/// Creates any missing tables. Safe to call on every startup.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
