//! This module acts as the central hub for all storage-related logic: the
//! record types, the `Store` interface the engine runs against, and its two
//! backends (Postgres for deployment, in-memory for tests and embedding).

pub mod init;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use models::{
    PlayerStats, Profile, ProfilePatch, Quest, QuestId, QuestPatch, QuestTemplate, StatsPatch,
    StreakHistoryEntry, UserId,
};

/// Failure from a storage backend. Surfaced unchanged through the engine;
/// retry policy, if any, lives behind the backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

/// The record store the engine consumes. Gets return `None`/empty rather
/// than erroring on missing records; only I/O failures are `Err`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError>;
    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch)
        -> Result<(), StoreError>;

    async fn get_stats(&self, user_id: UserId) -> Result<Option<PlayerStats>, StoreError>;
    async fn update_stats(&self, user_id: UserId, patch: StatsPatch) -> Result<(), StoreError>;

    /// All quests for the user on the given day, mandatory first, then in
    /// creation order.
    async fn get_quests(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<Quest>, StoreError>;
    async fn get_quest(&self, quest_id: QuestId) -> Result<Option<Quest>, StoreError>;
    async fn insert_quests(&self, quests: &[Quest]) -> Result<(), StoreError>;
    async fn update_quest(&self, quest_id: QuestId, patch: QuestPatch) -> Result<(), StoreError>;

    async fn get_active_templates(&self) -> Result<Vec<QuestTemplate>, StoreError>;

    /// History entries in `[from, to]` inclusive, newest first.
    async fn get_history(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StreakHistoryEntry>, StoreError>;
    /// Insert-or-overwrite keyed by (user, date).
    async fn upsert_history(&self, entry: &StreakHistoryEntry) -> Result<(), StoreError>;
}
