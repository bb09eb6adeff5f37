//! Integration tests for sequence sessions
//!
//! Tests:
//! - Time-limited stage cuts and early advance on exhaustion
//! - Deferred and immediate stage switches
//! - Completion of the final stage
//! - Recovery of a cut interrupted by a provider failure
//! - Sequence updates


use test_helpers::*;
use weave_core::storage::SessionItemFilter;
use weave_core::*;

struct Fixture {
    t: TestEngine,
    sequence: Sequence,
}

/// Three stages backed by pools `s0`, `s1`, `s2`; the first two are limited
async fn fixture(provider: FakeProvider, limits: [u32; 2]) -> Fixture {
    let t = TestEngine::new(provider).await;
    let mut stages = Vec::new();
    for (index, limit) in [Some(limits[0]), Some(limits[1]), None].into_iter().enumerate() {
        let pool = format!("s{index}");
        let blend = t
            .blend(draft(&format!("Stage {index}"), &[(pool.as_str(), 100.0)]))
            .await;
        stages.push(SequenceStage::new(blend.id, limit));
    }

    let sequence = t
        .engine
        .create_sequence(
            &owner(),
            CreateSequence {
                name: "Evening".to_string(),
                stages,
            },
        )
        .await
        .unwrap();

    Fixture { t, sequence }
}

fn stage_pools(counts: [usize; 3]) -> FakeProvider {
    FakeProvider::new()
        .with_pool("s0", "Warmup", counts[0])
        .with_pool("s1", "Focus", counts[1])
        .with_pool("s2", "Cooldown", counts[2])
}

#[tokio::test]
async fn test_start_plays_first_stage() {
    let Fixture { t, sequence } = fixture(stage_pools([3, 3, 3]), [30, 30]).await;

    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    assert_eq!(started.item.stage_index, Some(0));
    assert_eq!(started.item.pool_id, PoolId::new("s0"));
    let link = started.session.sequence.as_ref().unwrap();
    assert_eq!(link.stage_time_limit_minutes, Some(30));
    assert_eq!(link.transition, StageTransition::Playing);
    assert_eq!(
        t.items(SessionItemFilter::session(&started.session.id)).await.len(),
        3
    );
}

#[tokio::test]
async fn test_time_limit_cuts_to_next_stage() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [1, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    t.clock.advance_minutes(1);
    let drawn = t.engine.next_sequence_item(&id).await.unwrap();

    assert_eq!(drawn.stage_index, Some(1));
    assert_eq!(drawn.pool_id, PoolId::new("s1"));
    assert!(t
        .items(SessionItemFilter::session(&id).pool(&PoolId::new("s0")))
        .await
        .is_empty());

    let session = t.session(&id).await.unwrap();
    assert_eq!(session.start_time, t.clock.now());
    assert_eq!(session.blend_id, sequence.stages[1].blend_id);
}

#[tokio::test]
async fn test_within_limit_stays_on_stage() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [10, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    t.clock.advance_minutes(9);
    let drawn = t
        .engine
        .next_sequence_item(&started.session.id)
        .await
        .unwrap();
    assert_eq!(drawn.stage_index, Some(0));
}

#[tokio::test]
async fn test_deferred_switch_plays_one_more_item() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    t.engine.switch_sequence_stage(&id, 2, false).await.unwrap();
    let pending = t.session(&id).await.unwrap();
    assert_eq!(
        pending.sequence.unwrap().transition,
        StageTransition::PendingAdvance { target: 2 }
    );

    let last_of_stage = t.engine.next_sequence_item(&id).await.unwrap();
    assert_eq!(last_of_stage.pool_id, PoolId::new("s0"));
    let armed = t.session(&id).await.unwrap();
    assert_eq!(
        armed.sequence.unwrap().transition,
        StageTransition::Advancing { target: 2 }
    );

    let after = t.engine.next_sequence_item(&id).await.unwrap();
    assert_eq!(after.pool_id, PoolId::new("s2"));
    assert_eq!(after.stage_index, Some(2));
}

#[tokio::test]
async fn test_immediate_switch_repopulates_without_drawing() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 4, 5]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    t.engine.switch_sequence_stage(&id, 1, true).await.unwrap();

    let session = t.session(&id).await.unwrap();
    assert_eq!(session.stage_index(), Some(1));
    assert_eq!(session.blend_id, sequence.stages[1].blend_id);
    assert_eq!(session.sequence.unwrap().transition, StageTransition::Playing);

    let items = t.items(SessionItemFilter::session(&id)).await;
    assert_eq!(items.len(), 4);
    assert!(items
        .iter()
        .all(|i| i.pool_id == PoolId::new("s1") && !i.played));

    let drawn = t.engine.next_sequence_item(&id).await.unwrap();
    assert_eq!(drawn.stage_index, Some(1));
}

#[tokio::test]
async fn test_switch_rejects_out_of_range_stage() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    let err = t
        .engine
        .switch_sequence_stage(&started.session.id, 3, true)
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::InvalidInput(_)));
}

#[tokio::test]
async fn test_switch_rejects_plain_blend_session() {
    let t = TestEngine::new(stage_pools([3, 0, 0])).await;
    let blend = t.blend(draft("Plain", &[("s0", 100.0)])).await;
    let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

    let err = t
        .engine
        .switch_sequence_stage(&started.session.id, 0, true)
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::InvalidInput(_)));
}

#[tokio::test]
async fn test_exhausted_stage_advances_early() {
    let Fixture { t, sequence } = fixture(stage_pools([1, 3, 3]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    assert_eq!(started.item.pool_id, PoolId::new("s0"));

    let drawn = t
        .engine
        .next_sequence_item(&started.session.id)
        .await
        .unwrap();
    assert_eq!(drawn.stage_index, Some(1));
    assert_eq!(drawn.pool_id, PoolId::new("s1"));
}

#[tokio::test]
async fn test_empty_first_stage_is_skipped_on_start() {
    let Fixture { t, sequence } = fixture(stage_pools([0, 0, 2]), [30, 30]).await;

    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    assert_eq!(started.item.stage_index, Some(2));
    assert_eq!(started.item.pool_id, PoolId::new("s2"));
}

#[tokio::test]
async fn test_final_stage_exhaustion_completes_sequence() {
    let Fixture { t, sequence } = fixture(stage_pools([1, 1, 1]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    assert_eq!(
        t.engine.next_sequence_item(&id).await.unwrap().stage_index,
        Some(1)
    );
    assert_eq!(
        t.engine.next_sequence_item(&id).await.unwrap().stage_index,
        Some(2)
    );

    let err = t.engine.next_sequence_item(&id).await.unwrap_err();
    assert!(matches!(err, WeaveError::SequenceCompleted(ref s) if *s == sequence.id));
}

#[tokio::test]
async fn test_all_stages_empty_rolls_back_start() {
    let Fixture { t, sequence } = fixture(stage_pools([0, 0, 0]), [30, 30]).await;

    let err = t
        .engine
        .start_sequence(&sequence.id, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::SequenceCompleted(_)));
    assert_eq!(t.session_count().await, 0);
}

#[tokio::test]
async fn test_interrupted_cut_resumes_on_next_call() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [1, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    t.provider.fail_pool("s1");
    t.clock.advance_minutes(1);
    let err = t.engine.next_sequence_item(&id).await.unwrap_err();
    assert!(matches!(err, WeaveError::UpstreamFetch { .. }));

    let stuck = t.session(&id).await.unwrap();
    assert_eq!(
        stuck.sequence.unwrap().transition,
        StageTransition::Advancing { target: 1 }
    );

    t.provider.heal_pool("s1");
    let drawn = t.engine.next_sequence_item(&id).await.unwrap();
    assert_eq!(drawn.stage_index, Some(1));
    assert_eq!(t.items(SessionItemFilter::session(&id)).await.len(), 5);
}

#[tokio::test]
async fn test_next_item_routes_sequence_sessions() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [1, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    t.clock.advance_minutes(2);
    let drawn = t
        .engine
        .next_item(&started.session.id, &owner())
        .await
        .unwrap();
    assert_eq!(drawn.stage_index, Some(1));
}

#[tokio::test]
async fn test_sequence_start_keeps_other_sessions() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let plain = t.blend(draft("Plain", &[("s2", 100.0)])).await;
    t.engine.start_session(&plain.id, &owner()).await.unwrap();

    t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    assert_eq!(t.session_count().await, 2);
}

#[tokio::test]
async fn test_sequence_needs_owned_blends() {
    let t = TestEngine::new(stage_pools([1, 1, 1])).await;

    let err = t
        .engine
        .create_sequence(
            &owner(),
            CreateSequence {
                name: "Broken".to_string(),
                stages: vec![SequenceStage::new(BlendId::new("missing"), None)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::DefinitionNotFound(_)));
}

#[tokio::test]
async fn test_delete_sequence_ends_its_sessions() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    t.engine.delete_sequence(&sequence.id, &owner()).await.unwrap();

    assert!(t.session(&started.session.id).await.is_none());
    assert!(t.engine.list_sequences(&owner()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_time_limit_honors_pending_switch_target() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [1, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    let id = started.session.id.clone();

    t.engine.switch_sequence_stage(&id, 2, false).await.unwrap();
    t.clock.advance_minutes(1);

    let drawn = t.engine.next_sequence_item(&id).await.unwrap();
    assert_eq!(drawn.stage_index, Some(2));
    assert_eq!(drawn.pool_id, PoolId::new("s2"));
    let session = t.session(&id).await.unwrap();
    assert_eq!(session.sequence.unwrap().transition, StageTransition::Playing);
}

#[tokio::test]
async fn test_final_stage_repeat_all_keeps_playing() {
    let t = TestEngine::new(stage_pools([1, 0, 1])).await;
    let first = t.blend(draft("Warmup", &[("s0", 100.0)])).await;
    let mut looping = draft("Cooldown", &[("s2", 100.0)]);
    looping.repeat_mode = RepeatMode::All;
    let last = t.blend(looping).await;

    let sequence = t
        .engine
        .create_sequence(
            &owner(),
            CreateSequence {
                name: "Loop".to_string(),
                stages: vec![
                    SequenceStage::new(first.id, Some(30)),
                    SequenceStage::new(last.id, None),
                ],
            },
        )
        .await
        .unwrap();
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    assert_eq!(started.item.stage_index, Some(0));

    for _ in 0..4 {
        let drawn = t
            .engine
            .next_sequence_item(&started.session.id)
            .await
            .unwrap();
        assert_eq!(drawn.stage_index, Some(1));
        assert_eq!(drawn.pool_id, PoolId::new("s2"));
    }
}

#[tokio::test]
async fn test_update_sequence_replaces_stages_and_ends_sessions() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let started = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();

    let updated = t
        .engine
        .update_sequence(
            &sequence.id,
            &owner(),
            CreateSequence {
                name: "Short evening".to_string(),
                stages: vec![
                    SequenceStage::new(sequence.stages[1].blend_id.clone(), Some(15)),
                    SequenceStage::new(sequence.stages[2].blend_id.clone(), Some(60)),
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, sequence.id);
    assert_eq!(updated.created_at, sequence.created_at);
    assert_eq!(updated.len(), 2);
    assert_eq!(updated.limit_for(1), None);
    assert_eq!(t.engine.sequence(&sequence.id, &owner()).await.unwrap(), updated);
    assert!(t.session(&started.session.id).await.is_none());

    let restarted = t.engine.start_sequence(&sequence.id, &owner()).await.unwrap();
    assert_eq!(restarted.item.pool_id, PoolId::new("s1"));
}

#[tokio::test]
async fn test_update_sequence_rechecks_blend_ownership() {
    let Fixture { t, sequence } = fixture(stage_pools([5, 5, 5]), [30, 30]).await;
    let foreign = t
        .engine
        .create_definition(&UserId::new("mallory"), draft("Theirs", &[("s0", 100.0)]))
        .await
        .unwrap();

    let err = t
        .engine
        .update_sequence(
            &sequence.id,
            &owner(),
            CreateSequence {
                name: "Hijack".to_string(),
                stages: vec![SequenceStage::new(foreign.id, None)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::DefinitionNotFound(_)));
    assert_eq!(t.engine.sequence(&sequence.id, &owner()).await.unwrap(), sequence);

    let err = t
        .engine
        .update_sequence(
            &sequence.id,
            &UserId::new("mallory"),
            CreateSequence {
                name: "Hijack".to_string(),
                stages: vec![SequenceStage::new(sequence.stages[0].blend_id.clone(), None)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeaveError::SequenceNotFound(_)));
}
