//! Daily quest selection: one quest per lowest-leveled stat, plus a bonus
//! draw, generated at most once per user per calendar day.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::constants::MANDATORY_QUEST_SLOTS;
use crate::database::models::{PlayerStats, Quest, QuestTemplate, StatKind, UserId};
use crate::database::Store;
use crate::error::{EngineError, Entity};

use super::Engine;

impl<S: Store> Engine<S> {
    /// Returns today's quest set for the user, generating it first if the
    /// day has none yet. Re-invocation on the same day returns the stored
    /// set unchanged.
    ///
    /// Fails with [`EngineError::NoTemplatesAvailable`] only when the whole
    /// active catalog is empty at first generation; a single stat category
    /// without templates just loses its slot.
    #[instrument(skip(self))]
    pub async fn daily_quests(&self, user_id: UserId) -> Result<Vec<Quest>, EngineError> {
        let today = self.clock().today();
        let existing = self.store().get_quests(user_id, today).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        // Re-check under the lock: a concurrent call may have generated the
        // set between our first read and acquiring the lock.
        let existing = self.store().get_quests(user_id, today).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let stats = self
            .store()
            .get_stats(user_id)
            .await?
            .ok_or(EngineError::NotFound(Entity::Stats))?;
        let templates = self.store().get_active_templates().await?;
        if templates.is_empty() {
            return Err(EngineError::NoTemplatesAvailable);
        }

        let picks = select_templates(&stats, &templates, &mut rand::rng());
        let quests: Vec<Quest> = picks
            .iter()
            .map(|(template, mandatory)| Quest {
                id: Uuid::new_v4(),
                user_id,
                template_id: template.id,
                quest_date: today,
                title: template.title.clone(),
                description: template.description.clone(),
                stat: template.stat,
                xp_reward: template.xp_reward,
                is_mandatory: *mandatory,
                is_completed: false,
                completed_at: None,
                reflection: None,
            })
            .collect();
        self.store().insert_quests(&quests).await?;
        debug!(
            target: "engine.quests",
            user_id,
            count = quests.len(),
            "generated daily quest set"
        );

        self.store()
            .get_quests(user_id, today)
            .await
            .map_err(Into::into)
    }
}

/// Picks today's templates: one uniform draw per each of the four
/// lowest-leveled stats (mandatory), then one bonus draw from whatever
/// remains. A template is never drawn twice, and the bonus draw is omitted
/// when nothing is left. Sorting is stable, so equal levels keep
/// [`StatKind::ALL`] order.
pub fn select_templates<'a, R: Rng + ?Sized>(
    stats: &PlayerStats,
    templates: &'a [QuestTemplate],
    rng: &mut R,
) -> Vec<(&'a QuestTemplate, bool)> {
    let mut by_level: Vec<StatKind> = StatKind::ALL.to_vec();
    by_level.sort_by_key(|stat| stats.level_for(*stat));

    let mut picked: Vec<(&QuestTemplate, bool)> = Vec::new();
    let mut used: HashSet<Uuid> = HashSet::new();

    for stat in by_level.iter().take(MANDATORY_QUEST_SLOTS) {
        let pool: Vec<&QuestTemplate> = templates
            .iter()
            .filter(|t| t.stat == *stat && !used.contains(&t.id))
            .collect();
        if let Some(template) = pool.choose(rng) {
            used.insert(template.id);
            picked.push((*template, true));
        }
    }

    let pool: Vec<&QuestTemplate> = templates
        .iter()
        .filter(|t| !used.contains(&t.id))
        .collect();
    if let Some(template) = pool.choose(rng) {
        picked.push((*template, false));
    }

    picked
}
