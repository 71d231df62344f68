//! Integration tests for the session engine: the full create → join →
//! move → capture → restart flow, concurrency, and read views.

use std::sync::Arc;

use proptest::prelude::*;
use tagforge::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

const RADIUS: f64 = 250.0;
const EPS: f64 = 1e-9;

type TestEngine = SessionEngine<MemoryStore, AnonymousIdentities, ManualClock>;

fn owner(name: &str) -> OwnerId {
    OwnerId::new(name)
}

fn engine() -> TestEngine {
    SessionEngine::builder()
        .config(RegistryConfig {
            rng_seed: Some(2024),
            ..RegistryConfig::default()
        })
        .build(
            MemoryStore::new(),
            AnonymousIdentities::new(),
            ManualClock::new(1_000),
        )
}

/// A Playing session: alice is the runner, bob the chaser.
async fn playing(engine: &TestEngine) -> SessionId {
    let (sid, _) = engine.create_session(RADIUS, owner("alice")).await.unwrap();
    engine.join_session(sid, owner("bob")).await.unwrap();
    sid
}

/// Runner at (5, 0), chaser moved onto the origin.
async fn finished(engine: &TestEngine) -> SessionId {
    let sid = playing(engine).await;
    engine
        .move_player(sid, owner("alice"), Point::new(5.0, 0.0))
        .await
        .unwrap();
    engine
        .move_player(sid, owner("bob"), Point::ORIGIN)
        .await
        .unwrap();
    sid
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn test_create_then_join_starts_game() {
    let engine = engine();
    let (sid, runner_id) = engine.create_session(RADIUS, owner("alice")).await.unwrap();

    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Waiting);
    assert_eq!(snapshot.players.len(), 1);
    let runner = &snapshot.players[0];
    assert_eq!(runner.id, runner_id);
    assert_eq!(runner.role, Role::Runner);
    assert_eq!(runner.position, Point::ORIGIN);

    engine.registry().clock().advance(500);
    let chaser_id = engine.join_session(sid, owner("bob")).await.unwrap();

    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Playing);
    assert_eq!(snapshot.start_time, Some(1_500));
    let chaser = snapshot.player_of(&owner("bob")).unwrap();
    assert_eq!(chaser.id, chaser_id);
    assert_eq!(chaser.role, Role::Chaser);
    assert!((chaser.position.length() - RADIUS).abs() < 1e-6);
}

#[tokio::test]
async fn test_move_outside_arena_is_clamped() {
    let engine = engine();
    let sid = playing(&engine).await;

    let at = engine
        .move_player(sid, owner("alice"), Point::new(260.0, 0.0))
        .await
        .unwrap();
    assert!((at.x - 250.0).abs() < EPS && at.y.abs() < EPS);

    let stored = engine.get_session(sid).await.unwrap();
    assert_eq!(stored.player_of(&owner("alice")).unwrap().position, at);
}

#[tokio::test]
async fn test_chaser_reaching_runner_finishes_game() {
    let engine = engine();
    engine.registry().clock().set(7_000);
    let sid = finished(&engine).await;

    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Finished);
    assert_eq!(snapshot.winner_id, Some(owner("bob")));
    assert_eq!(snapshot.end_time, Some(7_000));
}

#[tokio::test]
async fn test_restart_resets_finished_game() {
    let engine = engine();
    let sid = finished(&engine).await;

    assert_eq!(engine.restart_session(sid).await.unwrap(), sid);

    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Playing);
    assert_eq!(snapshot.end_time, None);
    assert_eq!(snapshot.winner_id, None);
    let runner = snapshot.player_with_role(Role::Runner).unwrap();
    assert_eq!(runner.owner_id, owner("alice"));
    assert_eq!(runner.position, Point::ORIGIN);
    let chaser = snapshot.player_with_role(Role::Chaser).unwrap();
    assert_eq!(chaser.owner_id, owner("bob"));
    assert!((chaser.position.length() - RADIUS).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_identity_joining_twice_concurrently() {
    let engine = Arc::new(engine());
    let (sid, _) = engine.create_session(RADIUS, owner("alice")).await.unwrap();

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.join_session(sid, owner("bob")).await })
    };
    let second = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.join_session(sid, owner("bob")).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "exactly one join must succeed");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.player_of(&owner("bob")).unwrap().role, Role::Chaser);
}

// =========================================================================
// Properties
// =========================================================================

#[tokio::test]
async fn test_third_join_is_conflict() {
    let engine = engine();
    let sid = playing(&engine).await;

    let err = engine.join_session(sid, owner("carol")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Still a conflict once the game is over.
    engine
        .move_player(sid, owner("bob"), Point::ORIGIN)
        .await
        .unwrap();
    let err = engine.join_session(sid, owner("carol")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_joiners_fill_one_seat() {
    let engine = Arc::new(engine());
    let (sid, _) = engine.create_session(RADIUS, owner("alice")).await.unwrap();

    let tasks: Vec<_> = ["bob", "carol", "dave", "erin"]
        .into_iter()
        .map(|name| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.join_session(sid, owner(name)).await })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test]
async fn test_moves_fail_after_finish_until_restart() {
    let engine = engine();
    let sid = finished(&engine).await;

    for actor in ["alice", "bob"] {
        let err = engine
            .move_player(sid, owner(actor), Point::new(100.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(matches!(
            err.session_error(),
            Some(SessionError::SessionNotActive(_, SessionStatus::Finished))
        ));
    }

    engine.restart_session(sid).await.unwrap();
    engine
        .move_player(sid, owner("alice"), Point::new(100.0, 0.0))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_roles_are_stable_across_restarts() {
    let engine = engine();
    let sid = finished(&engine).await;

    for _ in 0..3 {
        engine.restart_session(sid).await.unwrap();
        let snapshot = engine.get_session(sid).await.unwrap();
        assert_eq!(snapshot.player_of(&owner("alice")).unwrap().role, Role::Runner);
        assert_eq!(snapshot.player_of(&owner("bob")).unwrap().role, Role::Chaser);

        // Bob walks onto Alice at the center and wins again.
        engine
            .move_player(sid, owner("bob"), Point::ORIGIN)
            .await
            .unwrap();
        let snapshot = engine.get_session(sid).await.unwrap();
        assert_eq!(snapshot.winner_id, Some(owner("bob")));
    }
}

#[tokio::test]
async fn test_get_session_does_not_mutate() {
    let engine = engine();
    let sid = playing(&engine).await;
    let mut updates = engine.subscribe(sid).await.unwrap();

    let first = engine.get_session(sid).await.unwrap();
    let second = engine.get_session(sid).await.unwrap();
    assert_eq!(first, second);
    assert!(updates.try_recv().is_err(), "reads must not publish updates");
}

#[tokio::test]
async fn test_non_finite_move_is_rejected() {
    let engine = engine();
    let sid = playing(&engine).await;
    let before = engine.get_session(sid).await.unwrap();

    for bad in [
        Point::new(f64::NAN, 0.0),
        Point::new(0.0, f64::INFINITY),
        Point::new(f64::NEG_INFINITY, f64::NAN),
    ] {
        let err = engine.move_player(sid, owner("alice"), bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    assert_eq!(engine.get_session(sid).await.unwrap(), before);
}

// =========================================================================
// Errors on missing or foreign things
// =========================================================================

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let engine = engine();
    let missing = SessionId(0xfeed);

    for err in [
        engine.get_session(missing).await.unwrap_err(),
        engine.join_session(missing, owner("bob")).await.unwrap_err(),
        engine
            .move_player(missing, owner("bob"), Point::ORIGIN)
            .await
            .unwrap_err(),
        engine.restart_session(missing).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_move_by_non_member_is_not_found() {
    let engine = engine();
    let sid = playing(&engine).await;
    let err = engine
        .move_player(sid, owner("mallory"), Point::ORIGIN)
        .await
        .unwrap_err();
    assert!(matches!(
        err.session_error(),
        Some(SessionError::PlayerNotInSession(..))
    ));
}

#[tokio::test]
async fn test_restart_while_playing_is_invalid_state() {
    let engine = engine();
    let sid = playing(&engine).await;
    let err = engine.restart_session(sid).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_create_with_zero_radius_is_invalid_input() {
    let engine = engine();
    let err = engine
        .create_session(0.0, owner("alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_builder_repairs_bad_rules_before_use() {
    let engine = SessionEngine::builder()
        .rules(GameRules {
            player_radius: f64::NAN,
            max_step: Some(-1.0),
            ..GameRules::default()
        })
        .build(MemoryStore::new(), NoIdentities, ManualClock::new(0));

    let rules = engine.registry().rules();
    assert_eq!(rules.player_radius, GameRules::DEFAULT_PLAYER_RADIUS);
    assert_eq!(rules.max_step, None);

    // The repaired radius is what capture uses.
    let (sid, _) = engine.create_session(RADIUS, owner("alice")).await.unwrap();
    engine.join_session(sid, owner("bob")).await.unwrap();
    let at = engine
        .move_player(sid, owner("bob"), Point::new(39.0, 0.0))
        .await
        .unwrap();
    assert_eq!(at, Point::new(39.0, 0.0));
    let snapshot = engine.get_session(sid).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Finished);
}

// =========================================================================
// Read views, presence, updates
// =========================================================================

#[tokio::test]
async fn test_get_session_fills_display_names() {
    let engine = engine();
    let alice = engine
        .identities()
        .register(AnonymousIdentities::CREATOR_DEFAULT_NAME, 1_000)
        .await;
    let bob = engine.identities().register("Bob", 1_001).await;

    let (sid, _) = engine.create_session(RADIUS, alice.clone()).await.unwrap();
    engine.join_session(sid, bob.clone()).await.unwrap();

    let snapshot = engine.get_session(sid).await.unwrap();
    let names: Vec<Option<&str>> = snapshot
        .players
        .iter()
        .map(|p| p.display_name.as_deref())
        .collect();
    assert_eq!(names, vec![Some("Player 1"), Some("Bob")]);

    // Unregistered owners simply have no name.
    let (other, _) = engine.create_session(RADIUS, owner("carol")).await.unwrap();
    let snapshot = engine.get_session(other).await.unwrap();
    assert_eq!(snapshot.players[0].display_name, None);
}

#[tokio::test]
async fn test_presence_does_not_change_status() {
    let engine = engine();
    let sid = playing(&engine).await;
    let mut updates = engine.subscribe(sid).await.unwrap();

    engine
        .set_player_active(sid, owner("bob"), false)
        .await
        .unwrap();
    let update = updates.recv().await.unwrap();
    assert!(matches!(
        update.cause,
        UpdateCause::Presence { active: false, .. }
    ));
    assert_eq!(update.session.status, SessionStatus::Playing);

    let err = engine
        .set_player_active(sid, owner("carol"), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_capture_arrives_as_one_update() {
    let engine = engine();
    let sid = playing(&engine).await;
    engine
        .move_player(sid, owner("alice"), Point::new(5.0, 0.0))
        .await
        .unwrap();
    let mut updates = engine.subscribe(sid).await.unwrap();

    engine
        .move_player(sid, owner("bob"), Point::ORIGIN)
        .await
        .unwrap();

    let update = updates.recv().await.unwrap();
    assert!(matches!(update.cause, UpdateCause::Caught { .. }));
    assert_eq!(update.session.status, SessionStatus::Finished);
    assert_eq!(
        update.session.player_of(&owner("bob")).unwrap().position,
        Point::ORIGIN
    );
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn test_update_encodes_as_json() {
    let engine = engine();
    let (sid, _) = engine.create_session(RADIUS, owner("alice")).await.unwrap();
    let mut updates = engine.subscribe(sid).await.unwrap();
    engine.join_session(sid, owner("bob")).await.unwrap();

    let update = updates.recv().await.unwrap();
    let bytes = JsonCodec.encode(&update).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["session_id"], sid.to_string());
    assert_eq!(json["cause"]["type"], "joined");
    assert_eq!(json["session"]["status"], "playing");
}

#[tokio::test]
async fn test_list_recent_and_sessions_for() {
    let engine = engine();
    let mut created = Vec::new();
    for i in 0..12 {
        let creator = if i % 2 == 0 { "alice" } else { "bob" };
        let (sid, _) = engine.create_session(RADIUS, owner(creator)).await.unwrap();
        created.push(sid);
        engine.registry().clock().advance(1_000);
    }

    let recent = engine.list_recent(DEFAULT_RECENT_LIMIT).await.unwrap();
    assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);
    assert_eq!(recent[0].id, created[11]);
    assert_eq!(recent[9].id, created[2]);

    let mine = engine.sessions_for(&owner("alice")).await.unwrap();
    assert_eq!(mine.len(), 6);
    assert!(mine.iter().all(|sid| created.iter().step_by(2).any(|c| c == sid)));
}

#[tokio::test]
async fn test_evicted_session_resumes_from_store() {
    let engine = engine();
    let sid = playing(&engine).await;
    engine
        .move_player(sid, owner("alice"), Point::new(0.0, -120.0))
        .await
        .unwrap();
    let before = engine.get_session(sid).await.unwrap();

    assert!(engine.evict(sid).await);
    assert_eq!(engine.get_session(sid).await.unwrap(), before);
}

// =========================================================================
// Boundary invariant under arbitrary play
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_stored_positions_stay_inside_arena(
        moves in prop::collection::vec(
            (any::<bool>(), -2_000.0f64..2_000.0, -2_000.0f64..2_000.0),
            1..40,
        ),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let engine = engine();
            let sid = playing(&engine).await;
            for (by_runner, x, y) in moves {
                let actor = if by_runner { owner("alice") } else { owner("bob") };
                if engine.move_player(sid, actor, Point::new(x, y)).await.is_err() {
                    // Finished: start another round and keep going.
                    engine.restart_session(sid).await.unwrap();
                }
                let snapshot = engine.get_session(sid).await.unwrap();
                for player in &snapshot.players {
                    prop_assert!(player.position.length() <= RADIUS + 1e-9);
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
