use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use lifequest::database::memory::MemoryStore;
use lifequest::database::models::{ProfilePatch, Quest, StatKind, UserId};
use lifequest::database::Store;
use lifequest::engine::clock::FixedClock;
use lifequest::error::{EngineError, Entity};
use lifequest::Engine;

const USER: UserId = 1;
const TODAY: (i32, u32, u32) = (2026, 8, 5);

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).expect("valid date")
}

fn quest(user: UserId, stat: StatKind, xp: i64) -> Quest {
    Quest {
        id: Uuid::new_v4(),
        user_id: user,
        template_id: Uuid::new_v4(),
        quest_date: today(),
        title: "quest".to_string(),
        description: String::new(),
        stat,
        xp_reward: xp,
        is_mandatory: true,
        is_completed: false,
        completed_at: None,
        reflection: None,
    }
}

async fn engine_with_quests(quests: &[Quest]) -> Engine<MemoryStore> {
    let engine = Engine::with_clock(MemoryStore::new(), Arc::new(FixedClock::new(today(), 9)));
    engine.store().seed_user(USER).await;
    engine.store().insert_quests(quests).await.unwrap();
    engine
}

#[tokio::test]
async fn completion_awards_xp_and_recomputes_levels() {
    let q = quest(USER, StatKind::Strength, 150);
    let engine = engine_with_quests(&[q.clone()]).await;

    let result = engine
        .complete_quest(USER, q.id, Some("felt strong".to_string()))
        .await
        .unwrap();
    assert_eq!(result.base_xp, 150);
    assert_eq!(result.effective_xp, 150);
    assert!(!result.multiplier_applied);
    assert!(!result.penalty_applied);
    assert!(!result.already_completed);

    let stats = engine.store().get_stats(USER).await.unwrap().unwrap();
    assert_eq!(stats.xp_for(StatKind::Strength), 150);
    assert_eq!(stats.level_for(StatKind::Strength), 2);

    let profile = engine.store().get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.total_xp, 150);
    assert_eq!(profile.player_level, 2); // floor(sqrt(150/50)) + 1

    let stored = engine.store().get_quest(q.id).await.unwrap().unwrap();
    assert!(stored.is_completed);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.reflection.as_deref(), Some("felt strong"));
}

#[tokio::test]
async fn completion_uses_streak_and_penalty_read_before_mutation() {
    let q = quest(USER, StatKind::Agility, 100);
    let engine = engine_with_quests(&[q.clone()]).await;
    engine
        .store()
        .update_profile(
            USER,
            ProfilePatch {
                current_streak: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = engine.complete_quest(USER, q.id, None).await.unwrap();
    assert_eq!(result.effective_xp, 200);
    assert!(result.multiplier_applied);

    // The advance triggered by this completion must not have fed back into
    // its own XP.
    let profile = engine.store().get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.current_streak, 11);
    assert_eq!(profile.total_xp, 200);
}

#[tokio::test]
async fn penalty_points_reduce_awarded_xp() {
    let q = quest(USER, StatKind::Vitality, 100);
    let engine = engine_with_quests(&[q.clone()]).await;
    engine
        .store()
        .update_profile(
            USER,
            ProfilePatch {
                penalty_points: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = engine.complete_quest(USER, q.id, None).await.unwrap();
    assert_eq!(result.effective_xp, 50);
    assert!(result.penalty_applied);
    assert!(!result.multiplier_applied);
}

#[tokio::test]
async fn recompletion_is_a_noop() {
    let q = quest(USER, StatKind::Discipline, 120);
    let engine = engine_with_quests(&[q.clone()]).await;

    engine
        .complete_quest(USER, q.id, Some("first".to_string()))
        .await
        .unwrap();
    let before = engine.store().get_profile(USER).await.unwrap().unwrap();

    let replay = engine
        .complete_quest(USER, q.id, Some("second".to_string()))
        .await
        .unwrap();
    assert!(replay.already_completed);
    assert_eq!(replay.effective_xp, 0);

    let after = engine.store().get_profile(USER).await.unwrap().unwrap();
    assert_eq!(after.total_xp, before.total_xp);
    assert_eq!(after.current_streak, before.current_streak);
    let stats = engine.store().get_stats(USER).await.unwrap().unwrap();
    assert_eq!(stats.xp_for(StatKind::Discipline), 120);
    // The original reflection survives the replay.
    let stored = engine.store().get_quest(q.id).await.unwrap().unwrap();
    assert_eq!(stored.reflection.as_deref(), Some("first"));
}

#[tokio::test]
async fn unknown_or_foreign_quest_is_not_found() {
    let q = quest(USER, StatKind::Charisma, 100);
    let engine = engine_with_quests(&[q.clone()]).await;

    let err = engine
        .complete_quest(USER, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(Entity::Quest)));

    // Another user's id never resolves someone else's quest.
    engine.store().seed_user(2).await;
    let err = engine.complete_quest(2, q.id, None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(Entity::Quest)));
}

#[tokio::test]
async fn four_of_five_maintains_the_day_three_does_not() {
    let quests: Vec<Quest> = (0..5).map(|_| quest(USER, StatKind::Strength, 10)).collect();
    let engine = engine_with_quests(&quests).await;

    for q in quests.iter().take(3) {
        engine.complete_quest(USER, q.id, None).await.unwrap();
    }
    let entry = engine
        .store()
        .get_history(USER, today(), today())
        .await
        .unwrap()
        .remove(0);
    assert_eq!(entry.quests_completed, 3);
    assert_eq!(entry.quests_total, 5);
    assert!(!entry.streak_maintained); // 60%

    engine
        .complete_quest(USER, quests[3].id, None)
        .await
        .unwrap();
    let entry = engine
        .store()
        .get_history(USER, today(), today())
        .await
        .unwrap()
        .remove(0);
    assert!((entry.completion_percentage - 80.0).abs() < 1e-9);
    assert!(entry.streak_maintained);
}

#[tokio::test]
async fn streak_advances_exactly_once_per_day() {
    let quests: Vec<Quest> = (0..5).map(|_| quest(USER, StatKind::Wealth, 10)).collect();
    let engine = engine_with_quests(&quests).await;

    let mut advances = 0;
    for q in &quests {
        let result = engine.complete_quest(USER, q.id, None).await.unwrap();
        if result.streak_advanced {
            advances += 1;
        }
    }
    // Crossing 80% advances; the fifth completion (100%) must not advance
    // again.
    assert_eq!(advances, 1);
    let profile = engine.store().get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.current_streak, 1);
    assert_eq!(profile.longest_streak, 1);
    assert_eq!(profile.last_quest_date, Some(today()));
}

#[tokio::test]
async fn history_accumulates_bonus_xp_across_completions() {
    let quests = [
        quest(USER, StatKind::Agility, 100),
        quest(USER, StatKind::Vitality, 100),
    ];
    let engine = engine_with_quests(&quests).await;
    engine
        .store()
        .update_profile(
            USER,
            ProfilePatch {
                current_streak: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine
        .complete_quest(USER, quests[0].id, None)
        .await
        .unwrap();
    engine
        .complete_quest(USER, quests[1].id, None)
        .await
        .unwrap();

    let entry = engine
        .store()
        .get_history(USER, today(), today())
        .await
        .unwrap()
        .remove(0);
    // Two completions at 1.5x over base 100 each.
    assert_eq!(entry.bonus_xp_earned, 100);
    assert!((entry.xp_multiplier - 1.5).abs() < 1e-9);
}

#[tokio::test]
async fn concurrent_completions_both_accumulate() {
    let quests = [
        quest(USER, StatKind::Strength, 100),
        quest(USER, StatKind::Agility, 100),
    ];
    let engine = engine_with_quests(&quests).await;

    let (a, b) = tokio::join!(
        engine.complete_quest(USER, quests[0].id, None),
        engine.complete_quest(USER, quests[1].id, None),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    let profile = engine.store().get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.total_xp, 200);

    let entry = engine
        .store()
        .get_history(USER, today(), today())
        .await
        .unwrap()
        .remove(0);
    assert_eq!(entry.quests_completed, 2);
    assert_eq!(entry.quests_total, 2);
    assert!((entry.completion_percentage - 100.0).abs() < 1e-9);

    // Whichever completion crossed the threshold advanced the streak; the
    // other must not have.
    assert!(a.streak_advanced != b.streak_advanced);
    assert_eq!(profile.current_streak, 1);
}
