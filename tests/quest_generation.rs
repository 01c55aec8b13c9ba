use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use lifequest::database::memory::MemoryStore;
use lifequest::database::models::{QuestTemplate, StatKind, StatsPatch, UserId};
use lifequest::database::Store;
use lifequest::engine::clock::FixedClock;
use lifequest::engine::quests::select_templates;
use lifequest::error::{EngineError, Entity};
use lifequest::Engine;

const USER: UserId = 1;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn template(stat: StatKind, title: &str) -> QuestTemplate {
    QuestTemplate {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        stat,
        xp_reward: 100,
        is_active: true,
    }
}

fn engine_at(date: NaiveDate) -> Engine<MemoryStore> {
    Engine::with_clock(MemoryStore::new(), Arc::new(FixedClock::new(date, 9)))
}

/// Stat XP laid out so the four lowest levels are agility, vitality,
/// intelligence, discipline, in that order.
async fn seed_spread_stats(engine: &Engine<MemoryStore>) {
    engine.store().seed_user(USER).await;
    let mut patch = StatsPatch::default();
    patch.xp.insert(StatKind::Strength, 600);
    patch.xp.insert(StatKind::Agility, 0);
    patch.xp.insert(StatKind::Vitality, 100);
    patch.xp.insert(StatKind::Intelligence, 200);
    patch.xp.insert(StatKind::Discipline, 300);
    patch.xp.insert(StatKind::Charisma, 400);
    patch.xp.insert(StatKind::Wealth, 500);
    engine.store().update_stats(USER, patch).await.unwrap();
}

#[tokio::test]
async fn generates_one_quest_per_weak_stat_plus_bonus() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    for stat in StatKind::ALL {
        engine.store().add_template(template(stat, "a")).await;
        engine.store().add_template(template(stat, "b")).await;
    }

    let quests = engine.daily_quests(USER).await.unwrap();
    assert_eq!(quests.len(), 5);

    let mandatory: Vec<_> = quests.iter().filter(|q| q.is_mandatory).collect();
    assert_eq!(mandatory.len(), 4);
    let mandatory_stats: HashSet<StatKind> = mandatory.iter().map(|q| q.stat).collect();
    let expected: HashSet<StatKind> = [
        StatKind::Agility,
        StatKind::Vitality,
        StatKind::Intelligence,
        StatKind::Discipline,
    ]
    .into_iter()
    .collect();
    assert_eq!(mandatory_stats, expected);

    // Never two quests from the same template in one day's set.
    let template_ids: HashSet<Uuid> = quests.iter().map(|q| q.template_id).collect();
    assert_eq!(template_ids.len(), quests.len());
}

#[tokio::test]
async fn generation_is_idempotent_per_day() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    for stat in StatKind::ALL {
        engine.store().add_template(template(stat, "a")).await;
    }

    let first = engine.daily_quests(USER).await.unwrap();
    let second = engine.daily_quests(USER).await.unwrap();
    let first_ids: HashSet<Uuid> = first.iter().map(|q| q.id).collect();
    let second_ids: HashSet<Uuid> = second.iter().map(|q| q.id).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(second.len(), first.len());
}

#[tokio::test]
async fn concurrent_generation_never_duplicates_the_set() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    for stat in StatKind::ALL {
        engine.store().add_template(template(stat, "a")).await;
    }

    let (first, second) = tokio::join!(engine.daily_quests(USER), engine.daily_quests(USER));
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.len(), 5);

    let first_ids: HashSet<Uuid> = first.iter().map(|q| q.id).collect();
    let second_ids: HashSet<Uuid> = second.iter().map(|q| q.id).collect();
    assert_eq!(first_ids, second_ids);

    // Only one set was ever stored.
    let stored = engine.store().get_quests(USER, day(2026, 8, 5)).await.unwrap();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn empty_catalog_is_an_error() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;

    let err = engine.daily_quests(USER).await.unwrap_err();
    assert!(matches!(err, EngineError::NoTemplatesAvailable));
}

#[tokio::test]
async fn unseeded_user_is_not_found() {
    let engine = engine_at(day(2026, 8, 5));
    engine.store().add_template(template(StatKind::Agility, "a")).await;

    let err = engine.daily_quests(99).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(Entity::Stats)));
}

#[tokio::test]
async fn stat_without_templates_loses_its_slot() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    // Templates exist only for one weak stat and one strong stat.
    engine.store().add_template(template(StatKind::Agility, "a")).await;
    engine.store().add_template(template(StatKind::Strength, "s")).await;

    let quests = engine.daily_quests(USER).await.unwrap();
    assert_eq!(quests.len(), 2);
    let agility = quests.iter().find(|q| q.stat == StatKind::Agility).unwrap();
    assert!(agility.is_mandatory);
    // The leftover draw is a bonus quest, not a fifth mandatory slot.
    let strength = quests.iter().find(|q| q.stat == StatKind::Strength).unwrap();
    assert!(!strength.is_mandatory);
}

#[tokio::test]
async fn inactive_templates_are_never_drawn() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    engine.store().add_template(template(StatKind::Agility, "a")).await;
    let mut dormant = template(StatKind::Vitality, "v");
    dormant.is_active = false;
    engine.store().add_template(dormant).await;

    let quests = engine.daily_quests(USER).await.unwrap();
    assert_eq!(quests.len(), 1);
    assert_eq!(quests[0].stat, StatKind::Agility);
}

#[tokio::test]
async fn bonus_is_omitted_when_catalog_is_exhausted() {
    let engine = engine_at(day(2026, 8, 5));
    seed_spread_stats(&engine).await;
    for stat in [
        StatKind::Agility,
        StatKind::Vitality,
        StatKind::Intelligence,
        StatKind::Discipline,
    ] {
        engine.store().add_template(template(stat, "only")).await;
    }

    let quests = engine.daily_quests(USER).await.unwrap();
    assert_eq!(quests.len(), 4);
    assert!(quests.iter().all(|q| q.is_mandatory));
}

#[test]
fn equal_levels_break_ties_in_declaration_order() {
    use lifequest::database::models::PlayerStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // All stats level 1: the four mandatory slots must be the first four
    // declared stats regardless of the rng.
    let stats = PlayerStats::new(USER);
    let templates: Vec<QuestTemplate> = StatKind::ALL
        .into_iter()
        .map(|stat| template(stat, "t"))
        .collect();

    let mut rng = StdRng::seed_from_u64(7);
    let picks = select_templates(&stats, &templates, &mut rng);
    let mandatory: Vec<StatKind> = picks
        .iter()
        .filter(|(_, mandatory)| *mandatory)
        .map(|(t, _)| t.stat)
        .collect();
    assert_eq!(
        mandatory,
        vec![
            StatKind::Strength,
            StatKind::Agility,
            StatKind::Vitality,
            StatKind::Intelligence,
        ]
    );
}
