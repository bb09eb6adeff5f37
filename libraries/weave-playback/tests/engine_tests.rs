//! Integration tests for blend definitions and blend sessions
//!
//! Tests:
//! - Definition validation, updates and owner scoping
//! - Draw without repetition, exhaustion and repeat-all
//! - Single-pool lock and scheduled reweights (both scopes)
//! - Session start rollback, reset, overview, end and idle purge


use std::collections::HashSet;
use test_helpers::*;
use weave_core::storage::{DefinitionFilter, SessionItemFilter};
use weave_core::types::UNKNOWN_POOL_NAME;
use weave_core::*;
use weave_playback::{EngineConfig, ReweightScope};

fn two_pools(a: usize, b: usize) -> FakeProvider {
    FakeProvider::new()
        .with_pool("a", "Alpha", a)
        .with_pool("b", "Beta", b)
}

// =============================================================================
// Definitions
// =============================================================================

mod definitions {
    use super::*;

    #[tokio::test]
    async fn test_weights_off_by_more_than_tolerance_are_rejected() {
        let t = TestEngine::new(two_pools(1, 1)).await;

        let err = t
            .engine
            .create_definition(&owner(), draft("Bad", &[("a", 60.0), ("b", 39.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::InvalidWeights(_)));

        let ok = t
            .engine
            .create_definition(&owner(), draft("Close", &[("a", 60.0), ("b", 39.995)]))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_bad_scheduled_reweight_is_rejected() {
        let t = TestEngine::new(two_pools(1, 1)).await;

        let mut bad = draft("Bad rule", &[("a", 50.0), ("b", 50.0)]);
        bad.scheduled_reweights = vec![ScheduledReweight {
            after_minutes: 5,
            new_weights: weights(&[("a", 10.0), ("b", 10.0)]),
        }];

        let err = t.engine.create_definition(&owner(), bad).await.unwrap_err();
        assert!(matches!(err, WeaveError::InvalidWeights(_)));
        assert_eq!(t.engine.list_definitions(&owner()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_update_weights_validates() {
        let t = TestEngine::new(two_pools(1, 1)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;

        let err = t
            .engine
            .update_weights(&blend.id, &owner(), weights(&[("a", 90.0), ("b", 20.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::InvalidWeights(_)));

        let updated = t
            .engine
            .update_weights(&blend.id, &owner(), weights(&[("a", 90.0), ("b", 10.0)]))
            .await
            .unwrap();
        assert_eq!(updated.weight_of(&PoolId::new("a")), Some(90.0));

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, updated.pools);
    }

    #[tokio::test]
    async fn test_update_definition_replaces_fields_and_keeps_identity() {
        let t = TestEngine::new(two_pools(5, 5)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        t.clock.advance_minutes(3);

        let mut edit = draft("Evening mix", &[("a", 30.0), ("b", 70.0)]);
        edit.repeat_mode = RepeatMode::All;
        edit.scheduled_reweights = vec![
            ScheduledReweight {
                after_minutes: 20,
                new_weights: weights(&[("b", 100.0)]),
            },
            ScheduledReweight {
                after_minutes: 5,
                new_weights: weights(&[("a", 100.0)]),
            },
        ];

        let updated = t
            .engine
            .update_definition(&blend.id, &owner(), edit)
            .await
            .unwrap();
        assert_eq!(updated.id, blend.id);
        assert_eq!(updated.created_at, blend.created_at);
        assert_eq!(updated.updated_at, t.clock.now());
        assert_eq!(updated.name, "Evening mix");
        assert_eq!(updated.repeat_mode, RepeatMode::All);
        let order: Vec<u32> = updated
            .scheduled_reweights
            .iter()
            .map(|rule| rule.after_minutes)
            .collect();
        assert_eq!(order, vec![5, 20]);

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_definition_rejects_invalid_draft() {
        let t = TestEngine::new(two_pools(1, 1)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;

        let err = t
            .engine
            .update_definition(&blend.id, &owner(), draft("Mix", &[("a", 50.0), ("b", 10.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::InvalidWeights(_)));

        let err = t
            .engine
            .update_definition(&blend.id, &UserId::new("mallory"), draft("Mine", &[("a", 100.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::DefinitionNotFound(_)));

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored, blend);
    }

    #[tokio::test]
    async fn test_other_owners_cannot_see_definition() {
        let t = TestEngine::new(two_pools(1, 1)).await;
        let blend = t.blend(draft("Mine", &[("a", 100.0)])).await;

        let err = t
            .engine
            .definition(&blend.id, &UserId::new("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::DefinitionNotFound(_)));

        let err = t
            .engine
            .start_session(&blend.id, &UserId::new("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::DefinitionNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_definition_ends_its_sessions() {
        let t = TestEngine::new(two_pools(3, 3)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        t.engine.delete_definition(&blend.id, &owner()).await.unwrap();

        assert!(t.session(&started.session.id).await.is_none());
        assert!(t
            .items(SessionItemFilter::session(&started.session.id))
            .await
            .is_empty());
        assert_eq!(
            t.storage
                .definitions()
                .count(&DefinitionFilter::default())
                .await
                .unwrap(),
            0
        );
    }
}

// =============================================================================
// Drawing
// =============================================================================

mod drawing {
    use super::*;

    #[tokio::test]
    async fn test_start_materializes_every_pool_and_draws_once() {
        let t = TestEngine::new(two_pools(4, 6)).await;
        let mut create = draft("Mix", &[("a", 70.0), ("b", 30.0)]);
        create.crossfade_seconds = 8;
        let blend = t.blend(create).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let all = t.items(SessionItemFilter::session(&started.session.id)).await;
        assert_eq!(all.len(), 10);
        assert_eq!(all.iter().filter(|i| i.played).count(), 1);
        assert_eq!(started.item.crossfade_seconds, 8);
        assert_eq!(started.item.stage_index, None);
        assert!(started.item.item.played);
    }

    #[tokio::test]
    async fn test_never_repeats_then_exhausts() {
        let t = TestEngine::new(two_pools(5, 5)).await;
        let blend = t.blend(draft("Mix", &[("a", 70.0), ("b", 30.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let mut seen = HashSet::new();
        seen.insert(started.item.item.track_id.clone());

        for _ in 0..9 {
            let drawn = t
                .engine
                .next_item(&started.session.id, &owner())
                .await
                .unwrap();
            assert!(seen.insert(drawn.item.track_id.clone()), "item repeated");
        }
        assert_eq!(seen.len(), 10);

        let err = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap_err();
        assert!(err.is_exhausted());
    }

    #[tokio::test]
    async fn test_repeat_all_restarts_with_cleared_flags() {
        let t = TestEngine::new(two_pools(3, 2)).await;
        let mut create = draft("Loop", &[("a", 50.0), ("b", 50.0)]);
        create.repeat_mode = RepeatMode::All;
        let blend = t.blend(create).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let id = started.session.id.clone();
        for _ in 0..4 {
            t.engine.next_item(&id, &owner()).await.unwrap();
        }

        let drawn = t.engine.next_item(&id, &owner()).await.unwrap();
        assert!(drawn.item.played);

        let played = t.items(SessionItemFilter::session(&id).played()).await;
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].id, drawn.item.id);
    }

    #[tokio::test]
    async fn test_repeat_one_still_exhausts() {
        let t = TestEngine::new(two_pools(1, 0)).await;
        let mut create = draft("One", &[("a", 100.0)]);
        create.repeat_mode = RepeatMode::One;
        let blend = t.blend(create).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let err = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::Exhausted));
    }

    #[tokio::test]
    async fn test_sequential_order_follows_positions() {
        let t = TestEngine::new(two_pools(3, 0)).await;
        let blend = t.blend(draft("Solo", &[("a", 100.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let second = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap();
        let third = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap();

        let positions = [
            started.item.item.position,
            second.item.position,
            third.item.position,
        ];
        assert_eq!(positions, [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_empty_pool_falls_through_to_others() {
        let t = TestEngine::new(two_pools(0, 4)).await;
        let blend = t.blend(draft("Lopsided", &[("a", 90.0), ("b", 10.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        assert_eq!(started.item.pool_id, PoolId::new("b"));
        for _ in 0..3 {
            let drawn = t
                .engine
                .next_item(&started.session.id, &owner())
                .await
                .unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("b"));
        }
    }

    #[tokio::test]
    async fn test_single_pool_lock_draws_only_locked_pool() {
        let t = TestEngine::new(two_pools(30, 30)).await;
        let mut create = draft("Locked", &[("a", 70.0), ("b", 30.0)]);
        create.single_pool_lock = true;
        let blend = t.blend(create).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let id = started.session.id.clone();
        let session = t
            .engine
            .lock_pool(&id, &owner(), Some(PoolId::new("a")))
            .await
            .unwrap();
        assert_eq!(session.current_pool_id, Some(PoolId::new("a")));

        for _ in 0..20 {
            let drawn = t.engine.next_item(&id, &owner()).await.unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("a"));
            assert_eq!(drawn.pool_name, "Alpha");
        }
    }

    #[tokio::test]
    async fn test_lock_pool_rejects_foreign_pool() {
        let t = TestEngine::new(two_pools(3, 3)).await;
        let mut create = draft("Locked", &[("a", 70.0), ("b", 30.0)]);
        create.single_pool_lock = true;
        let blend = t.blend(create).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let err = t
            .engine
            .lock_pool(&started.session.id, &owner(), Some(PoolId::new("zzz")))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_owner_mismatch_is_session_not_found() {
        let t = TestEngine::new(two_pools(3, 3)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let err = t
            .engine
            .next_item(&started.session.id, &UserId::new("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::SessionNotFound(_)));

        let err = t
            .engine
            .session(&started.session.id, &UserId::new("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::SessionNotFound(_)));

        let own = t.engine.session(&started.session.id, &owner()).await.unwrap();
        assert_eq!(own.blend_id, blend.id);
    }

    #[tokio::test]
    async fn test_pool_name_failure_degrades_and_names_are_cached() {
        let provider = FakeProvider::new()
            .with_pool("a", "Alpha", 5)
            .with_unnamed_pool("ghost", 5);
        let t = TestEngine::new(provider).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("ghost", 50.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let mut drawn = vec![started.item];
        for _ in 0..9 {
            drawn.push(
                t.engine
                    .next_item(&started.session.id, &owner())
                    .await
                    .unwrap(),
            );
        }

        for item in &drawn {
            let expected = if item.pool_id == PoolId::new("a") {
                "Alpha"
            } else {
                UNKNOWN_POOL_NAME
            };
            assert_eq!(item.pool_name, expected);
        }

        // "Alpha" is looked up once; failures are retried on every draw
        let ghost_draws = drawn
            .iter()
            .filter(|d| d.pool_id == PoolId::new("ghost"))
            .count();
        assert_eq!(t.provider.name_lookups(), 1 + ghost_draws);
    }

    #[tokio::test]
    async fn test_enrichment_refreshes_metadata() {
        let config = EngineConfig {
            enrich_items: true,
            ..EngineConfig::default()
        };
        let t = TestEngine::with_config(two_pools(1, 0), config).await;
        t.provider.set_details(ProviderItem {
            id: TrackId::new("a-0"),
            title: "Remastered".to_string(),
            artists: vec!["New Artist".to_string()],
            album: None,
            duration_ms: 1,
            cover_url: Some("https://img/new.jpg".to_string()),
        });
        let blend = t.blend(draft("Solo", &[("a", 100.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        assert_eq!(started.item.item.title, "Remastered");

        let stored = t
            .items(SessionItemFilter::by_id(&started.item.item.id))
            .await;
        assert_eq!(stored[0].cover_url.as_deref(), Some("https://img/new.jpg"));
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_stored_copy() {
        let config = EngineConfig {
            enrich_items: true,
            ..EngineConfig::default()
        };
        let t = TestEngine::with_config(two_pools(1, 0), config).await;
        t.provider.fail_item_lookups();
        let blend = t.blend(draft("Solo", &[("a", 100.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        assert_eq!(started.item.item.title, "Alpha #0");
    }
}

// =============================================================================
// Scheduled reweights
// =============================================================================

mod reweights {
    use super::*;

    fn scheduled() -> CreateBlendDefinition {
        let mut create = draft("Evening", &[("a", 50.0), ("b", 50.0)]);
        create.scheduled_reweights = vec![ScheduledReweight {
            after_minutes: 10,
            new_weights: weights(&[("a", 0.0), ("b", 100.0)]),
        }];
        create
    }

    #[tokio::test]
    async fn test_due_rule_moves_every_draw_to_new_weights() {
        let t = TestEngine::new(two_pools(20, 20)).await;
        let blend = t.blend(scheduled()).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        t.clock.advance_minutes(11);
        for _ in 0..10 {
            let drawn = t
                .engine
                .next_item(&started.session.id, &owner())
                .await
                .unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("b"));
        }

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, weights(&[("a", 0.0), ("b", 100.0)]));
    }

    #[tokio::test]
    async fn test_update_weights_may_drop_a_scheduled_pool() {
        let t = TestEngine::new(two_pools(20, 20)).await;
        let blend = t.blend(scheduled()).await;

        let updated = t
            .engine
            .update_weights(&blend.id, &owner(), weights(&[("a", 100.0)]))
            .await
            .unwrap();
        assert_eq!(updated.pools, weights(&[("a", 100.0)]));
        assert_eq!(updated.scheduled_reweights, blend.scheduled_reweights);

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        assert_eq!(started.item.pool_id, PoolId::new("a"));

        t.clock.advance_minutes(10);
        let drawn = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap();
        assert_eq!(drawn.pool_id, PoolId::new("b"));
    }

    #[tokio::test]
    async fn test_later_rule_overrides_earlier_within_a_session() {
        let t = TestEngine::new(two_pools(20, 20)).await;
        let mut create = draft("Evening", &[("a", 50.0), ("b", 50.0)]);
        create.scheduled_reweights = vec![
            ScheduledReweight {
                after_minutes: 5,
                new_weights: weights(&[("a", 100.0), ("b", 0.0)]),
            },
            ScheduledReweight {
                after_minutes: 10,
                new_weights: weights(&[("a", 0.0), ("b", 100.0)]),
            },
        ];
        let blend = t.blend(create).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let id = started.session.id.clone();

        t.clock.advance_minutes(6);
        for _ in 0..5 {
            let drawn = t.engine.next_item(&id, &owner()).await.unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("a"));
        }

        t.clock.advance_minutes(5);
        for _ in 0..5 {
            let drawn = t.engine.next_item(&id, &owner()).await.unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("b"));
        }

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, weights(&[("a", 0.0), ("b", 100.0)]));
    }

    #[tokio::test]
    async fn test_invalid_stored_rule_is_rejected_before_persisting() {
        let t = TestEngine::new(two_pools(20, 20)).await;
        let blend = t.blend(scheduled()).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let mut corrupted = blend.clone();
        corrupted.scheduled_reweights[0].new_weights = weights(&[("a", 5.0), ("b", 5.0)]);
        assert!(t.storage.definitions().update(&corrupted).await.unwrap());

        t.clock.advance_minutes(11);
        let err = t
            .engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::InvalidWeights(_)));

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, weights(&[("a", 50.0), ("b", 50.0)]));
        assert_eq!(stored.updated_at, blend.updated_at);
    }

    #[tokio::test]
    async fn test_rule_not_due_before_its_minute() {
        let t = TestEngine::new(two_pools(20, 20)).await;
        let blend = t.blend(scheduled()).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        t.clock.advance_minutes(9);
        t.engine
            .next_item(&started.session.id, &owner())
            .await
            .unwrap();

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, weights(&[("a", 50.0), ("b", 50.0)]));
    }

    #[tokio::test]
    async fn test_snapshot_scope_keeps_definition() {
        let config = EngineConfig {
            reweight_scope: ReweightScope::SessionSnapshot,
            ..EngineConfig::default()
        };
        let t = TestEngine::with_config(two_pools(20, 20), config).await;
        let blend = t.blend(scheduled()).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        t.clock.advance_minutes(11);
        for _ in 0..10 {
            let drawn = t
                .engine
                .next_item(&started.session.id, &owner())
                .await
                .unwrap();
            assert_eq!(drawn.pool_id, PoolId::new("b"));
        }

        let stored = t.engine.definition(&blend.id, &owner()).await.unwrap();
        assert_eq!(stored.pools, weights(&[("a", 50.0), ("b", 50.0)]));

        let session = t.session(&started.session.id).await.unwrap();
        assert_eq!(
            session.weight_snapshot,
            Some(weights(&[("a", 0.0), ("b", 100.0)]))
        );
    }
}

// =============================================================================
// Session lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_reset_allows_played_items_again() {
        let t = TestEngine::new(two_pools(1, 0)).await;
        let blend = t.blend(draft("Solo", &[("a", 100.0)])).await;

        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let id = started.session.id.clone();
        assert!(t.engine.next_item(&id, &owner()).await.is_err());

        t.engine.reset_session(&id).await.unwrap();

        let again = t.engine.next_item(&id, &owner()).await.unwrap();
        assert_eq!(again.item.track_id, started.item.item.track_id);
        assert_eq!(t.session(&id).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_reset_unknown_session() {
        let t = TestEngine::new(two_pools(1, 0)).await;
        let err = t
            .engine
            .reset_session(&SessionId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_start_rolls_back_on_provider_failure() {
        let t = TestEngine::new(two_pools(3, 3)).await;
        t.provider.fail_pool("b");
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;

        let err = t.engine.start_session(&blend.id, &owner()).await.unwrap_err();
        assert!(matches!(err, WeaveError::UpstreamFetch { .. }));
        assert_eq!(t.session_count().await, 0);
        assert!(t.items(SessionItemFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_start_rolls_back_when_nothing_to_draw() {
        let t = TestEngine::new(two_pools(0, 0)).await;
        let blend = t.blend(draft("Empty", &[("a", 50.0), ("b", 50.0)])).await;

        let err = t.engine.start_session(&blend.id, &owner()).await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(t.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sessions_of_same_blend_are_isolated() {
        let t = TestEngine::new(two_pools(2, 0)).await;
        let blend = t.blend(draft("Solo", &[("a", 100.0)])).await;

        let first = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let second = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        assert_eq!(first.item.item.track_id, second.item.item.track_id);
        assert_eq!(t.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_session_overview_lists_every_item() {
        let t = TestEngine::new(two_pools(2, 3)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let tracks = t
            .engine
            .session_items(&started.session.id, &owner())
            .await
            .unwrap();
        assert_eq!(tracks.len(), 5);
        assert_eq!(tracks.iter().filter(|t| t.item.played).count(), 1);
        for track in &tracks {
            let expected = if track.item.pool_id == PoolId::new("a") {
                "Alpha"
            } else {
                "Beta"
            };
            assert_eq!(track.pool_name, expected);
        }
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let t = TestEngine::new(two_pools(2, 2)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let id = started.session.id;

        assert!(t.engine.end_session(&id, &owner()).await.unwrap());
        assert!(!t.engine.end_session(&id, &owner()).await.unwrap());
        assert!(t.items(SessionItemFilter::session(&id)).await.is_empty());

        let err = t.engine.next_item(&id, &owner()).await.unwrap_err();
        assert!(matches!(err, WeaveError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_end_session_ignores_other_owners() {
        let t = TestEngine::new(two_pools(2, 2)).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;
        let started = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        let ended = t
            .engine
            .end_session(&started.session.id, &UserId::new("mallory"))
            .await
            .unwrap();
        assert!(!ended);
        assert!(t.session(&started.session.id).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_removes_only_idle_sessions() {
        let config = EngineConfig {
            session_idle_timeout_minutes: 60,
            ..EngineConfig::default()
        };
        let t = TestEngine::with_config(two_pools(5, 5), config).await;
        let blend = t.blend(draft("Mix", &[("a", 50.0), ("b", 50.0)])).await;

        let idle = t.engine.start_session(&blend.id, &owner()).await.unwrap();
        let active = t.engine.start_session(&blend.id, &owner()).await.unwrap();

        t.clock.advance_minutes(90);
        t.engine
            .next_item(&active.session.id, &owner())
            .await
            .unwrap();

        assert_eq!(t.engine.purge_idle_sessions().await.unwrap(), 1);
        assert!(t.session(&idle.session.id).await.is_none());
        assert!(t.session(&active.session.id).await.is_some());
    }
}
