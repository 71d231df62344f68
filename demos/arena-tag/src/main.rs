//! Arena tag: a scripted match played against the session engine.
//!
//! Two bots play. The runner circles the arena; the chaser heads straight
//! for wherever the runner is. Both are held to the same per-move speed
//! limit, so the chaser wins by cutting the corner. Every committed update
//! is printed as the JSON a browser client would receive.
//!
//! ```text
//! RUST_LOG=debug cargo run -p arena-tag -- [config.json]
//! ```
//!
//! The optional config file may set any of `radius`, `rounds`,
//! `max_ticks`, `rules`, and `registry`.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tagforge::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Demo configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    radius: f64,
    rounds: u32,
    /// Moves per bot before a round is abandoned.
    max_ticks: u32,
    rules: GameRules,
    registry: RegistryConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            radius: 250.0,
            rounds: 2,
            max_ticks: 2_000,
            rules: GameRules {
                max_step: Some(3.0),
                ..GameRules::default()
            },
            registry: RegistryConfig::default(),
        }
    }
}

fn load_config(path: Option<String>) -> Result<DemoConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(DemoConfig::default());
    };
    let raw = std::fs::read_to_string(&path)?;
    let config = serde_json::from_str(&raw)?;
    tracing::info!(%path, "loaded demo config");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

/// Radius of the circle the runner tries to follow.
const RUNNER_ORBIT: f64 = 0.6;
/// Angle the runner advances per move.
const RUNNER_ANGLE_STEP: f64 = 0.015;

type DemoEngine = SessionEngine<MemoryStore, AnonymousIdentities, SystemClock>;

/// Plays until the chaser wins or `max_ticks` runs out. Returns the
/// number of ticks the capture took.
async fn play_round(
    engine: &DemoEngine,
    session_id: SessionId,
    runner: &OwnerId,
    chaser: &OwnerId,
    max_ticks: u32,
) -> Result<Option<u32>, TagforgeError> {
    let start = engine.get_session(session_id).await?;
    let orbit = start.radius * RUNNER_ORBIT;
    let mut angle = 0.0f64;

    for tick in 1..=max_ticks {
        angle = (angle + RUNNER_ANGLE_STEP) % TAU;
        let target = Point::new(orbit * angle.cos(), orbit * angle.sin());
        let runner_at = engine.move_player(session_id, runner.clone(), target).await?;

        if engine.get_session(session_id).await?.status == SessionStatus::Finished {
            return Ok(Some(tick));
        }

        engine
            .move_player(session_id, chaser.clone(), runner_at)
            .await?;
        if engine.get_session(session_id).await?.status == SessionStatus::Finished {
            return Ok(Some(tick));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(std::env::args().nth(1))?;
    let engine = SessionEngine::builder()
        .rules(config.rules.clone())
        .config(config.registry.clone())
        .build(MemoryStore::new(), AnonymousIdentities::new(), SystemClock);

    let now = SystemClock.now_ms();
    let runner = engine
        .identities()
        .register(AnonymousIdentities::CREATOR_DEFAULT_NAME, now)
        .await;
    let chaser = engine
        .identities()
        .register(AnonymousIdentities::JOINER_DEFAULT_NAME, now)
        .await;

    let (session_id, _) = engine.create_session(config.radius, runner.clone()).await?;
    println!("session {session_id}: share this id to invite an opponent");

    let mut updates = engine.subscribe(session_id).await?;
    let printer = tokio::spawn(async move {
        let codec = JsonCodec;
        loop {
            match updates.recv().await {
                Ok(update) => match codec.encode(&update) {
                    Ok(bytes) if !matches!(update.cause, UpdateCause::Moved { .. }) => {
                        println!("{}", String::from_utf8_lossy(&bytes));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "could not encode update"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "printer fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    engine.join_session(session_id, chaser.clone()).await?;

    for round in 1..=config.rounds {
        if round > 1 {
            engine.restart_session(session_id).await?;
        }
        match play_round(&engine, session_id, &runner, &chaser, config.max_ticks).await? {
            Some(ticks) => println!("round {round}: caught after {ticks} ticks"),
            None => println!("round {round}: runner escaped for {} ticks", config.max_ticks),
        }
    }

    let snapshot = engine.get_session(session_id).await?;
    for player in &snapshot.players {
        println!(
            "{} ({}) at {}",
            player.display_name.as_deref().unwrap_or("?"),
            player.role,
            player.position
        );
    }
    for summary in engine.list_recent(DEFAULT_RECENT_LIMIT).await? {
        println!("recent: {} {}", summary.id, summary.status);
    }

    // Evicting stops the session task, which closes the update stream.
    engine.evict(session_id).await;
    let _ = printer.await;
    Ok(())
}
