//! In-memory `Store` backend. Used by the test-suite and by embedders that
//! want the engine without a database. Every trait method takes the single
//! state lock once, so each storage operation is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::models::{
    PlayerStats, Profile, ProfilePatch, Quest, QuestId, QuestPatch, QuestTemplate, StatsPatch,
    StreakHistoryEntry, UserId,
};
use super::{Store, StoreError};

#[derive(Default)]
struct Inner {
    profiles: HashMap<UserId, Profile>,
    stats: HashMap<UserId, PlayerStats>,
    // Insertion order doubles as creation order for quest listing.
    quests: Vec<Quest>,
    templates: Vec<QuestTemplate>,
    history: HashMap<(UserId, NaiveDate), StreakHistoryEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with a fresh profile and zeroed stats.
    pub async fn seed_user(&self, user_id: UserId) {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(user_id, Profile::new(user_id));
        inner.stats.insert(user_id, PlayerStats::new(user_id));
    }

    pub async fn add_template(&self, template: QuestTemplate) {
        self.inner.write().await.templates.push(template);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        patch: ProfilePatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(profile) = inner.profiles.get_mut(&user_id) {
            patch.apply_to(profile);
        }
        Ok(())
    }

    async fn get_stats(&self, user_id: UserId) -> Result<Option<PlayerStats>, StoreError> {
        Ok(self.inner.read().await.stats.get(&user_id).cloned())
    }

    async fn update_stats(&self, user_id: UserId, patch: StatsPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(stats) = inner.stats.get_mut(&user_id) {
            for (stat, xp) in patch.xp {
                stats.xp.insert(stat, xp);
            }
        }
        Ok(())
    }

    async fn get_quests(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<Quest>, StoreError> {
        let inner = self.inner.read().await;
        let mut quests: Vec<Quest> = inner
            .quests
            .iter()
            .filter(|q| q.user_id == user_id && q.quest_date == date)
            .cloned()
            .collect();
        // Stable sort keeps creation order within each group.
        quests.sort_by_key(|q| !q.is_mandatory);
        Ok(quests)
    }

    async fn get_quest(&self, quest_id: QuestId) -> Result<Option<Quest>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .quests
            .iter()
            .find(|q| q.id == quest_id)
            .cloned())
    }

    async fn insert_quests(&self, quests: &[Quest]) -> Result<(), StoreError> {
        self.inner.write().await.quests.extend_from_slice(quests);
        Ok(())
    }

    async fn update_quest(&self, quest_id: QuestId, patch: QuestPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(quest) = inner.quests.iter_mut().find(|q| q.id == quest_id) {
            patch.apply_to(quest);
        }
        Ok(())
    }

    async fn get_active_templates(&self) -> Result<Vec<QuestTemplate>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .templates
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn get_history(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StreakHistoryEntry>, StoreError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<StreakHistoryEntry> = inner
            .history
            .values()
            .filter(|h| h.user_id == user_id && h.date >= from && h.date <= to)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn upsert_history(&self, entry: &StreakHistoryEntry) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .history
            .insert((entry.user_id, entry.date), entry.clone());
        Ok(())
    }
}
