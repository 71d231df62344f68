//! Gameplay rules.
//!
//! Collision size, where the chaser appears, and how far a single move
//! may travel are gameplay policy rather than protocol, so they live in
//! one config struct. The defaults reproduce the classic game.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tagforge_protocol::Point;
use tracing::warn;

use crate::geometry;

// ---------------------------------------------------------------------------
// SpawnPolicy
// ---------------------------------------------------------------------------

/// Where the chaser is placed when a game starts or restarts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnPolicy {
    /// A uniformly random angle on the boundary.
    #[default]
    RandomEdge,
    /// Always the same boundary point. Handy for replays and tests.
    FixedAngle { radians: f64 },
}

// ---------------------------------------------------------------------------
// GameRules
// ---------------------------------------------------------------------------

/// Rules applied by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Radius of a player's body. Two players collide when their centers
    /// are closer than twice this.
    pub player_radius: f64,

    /// Where the chaser spawns.
    pub chaser_spawn: SpawnPolicy,

    /// Longest distance a single move may cover. `None` disables the
    /// speed clamp; the boundary clamp always applies.
    pub max_step: Option<f64>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            player_radius: Self::DEFAULT_PLAYER_RADIUS,
            chaser_spawn: SpawnPolicy::RandomEdge,
            max_step: None,
        }
    }
}

impl GameRules {
    pub const DEFAULT_PLAYER_RADIUS: f64 = 20.0;

    /// Center-to-center distance below which the chaser catches the runner.
    pub fn capture_distance(&self) -> f64 {
        2.0 * self.player_radius
    }

    /// Picks the chaser's starting point for an arena of `radius`.
    pub fn chaser_spawn_point<R: Rng + ?Sized>(&self, radius: f64, rng: &mut R) -> Point {
        match self.chaser_spawn {
            SpawnPolicy::RandomEdge => geometry::random_edge_point(radius, rng),
            SpawnPolicy::FixedAngle { radians } => geometry::edge_point(radius, radians),
        }
    }

    /// Replaces out-of-range values with safe ones.
    ///
    /// - `player_radius` must be finite and non-negative, else the default.
    /// - `max_step` must be finite and positive, else the clamp is disabled.
    /// - A non-finite fixed spawn angle falls back to random placement.
    pub fn validated(mut self) -> Self {
        if !self.player_radius.is_finite() || self.player_radius < 0.0 {
            warn!(
                player_radius = self.player_radius,
                "invalid player_radius, using default"
            );
            self.player_radius = Self::DEFAULT_PLAYER_RADIUS;
        }
        if let Some(step) = self.max_step {
            if !step.is_finite() || step <= 0.0 {
                warn!(max_step = step, "invalid max_step, disabling speed clamp");
                self.max_step = None;
            }
        }
        if let SpawnPolicy::FixedAngle { radians } = self.chaser_spawn {
            if !radians.is_finite() {
                warn!("non-finite spawn angle, using random edge placement");
                self.chaser_spawn = SpawnPolicy::RandomEdge;
            }
        }
        self
    }
}
