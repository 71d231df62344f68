//! The session entity: one arena, up to two players, and every rule that
//! changes them.
//!
//! A [`Session`] is plain data plus methods. It knows nothing about
//! storage, channels, or other callers. The layer above owns one instance
//! per live session and is responsible for applying methods one at a time.
//!
//! Every mutating method checks all of its preconditions before touching
//! any field, so an `Err` always leaves the session exactly as it was.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tagforge_protocol::{
    OwnerId, PlayerId, PlayerSnapshot, Point, Role, SessionId, SessionSnapshot,
    SessionStatus, SessionSummary,
};

use crate::{GameRules, SessionError, geometry};

/// A session never holds more than this many players.
pub const MAX_PLAYERS: usize = 2;

// ---------------------------------------------------------------------------
// Records (the persisted shape)
// ---------------------------------------------------------------------------

/// The session row as it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub status: SessionStatus,
    /// Arena radius. Positive, fixed at creation.
    pub radius: f64,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// Owner of the chaser, once the chaser has caught the runner.
    pub winner_id: Option<OwnerId>,
}

/// The player row as it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub session_id: SessionId,
    pub owner_id: OwnerId,
    pub role: Role,
    /// Always inside the arena: `|position| <= radius`.
    pub position: Point,
    /// Liveness flag for disconnect handling. Never affects status.
    pub active: bool,
    pub joined_at: u64,
}

impl Player {
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            owner_id: self.owner_id.clone(),
            role: self.role,
            position: self.position,
            active: self.active,
            joined_at: self.joined_at,
            display_name: None,
        }
    }
}

/// What a successful move did.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub player_id: PlayerId,
    /// The stored position after the speed and boundary clamps.
    pub position: Point,
    /// Set when this move ended the game; holds the chaser's owner.
    pub winner_id: Option<OwnerId>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One tag match.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    record: SessionRecord,
    players: Vec<Player>,
}

impl Session {
    /// Starts a new session with `creator` as the runner at the center.
    ///
    /// # Errors
    /// [`SessionError::InvalidRadius`] unless `radius` is positive and finite.
    pub fn create(
        id: SessionId,
        player_id: PlayerId,
        radius: f64,
        creator: OwnerId,
        now: u64,
    ) -> Result<Self, SessionError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SessionError::InvalidRadius(radius));
        }

        let record = SessionRecord {
            id,
            status: SessionStatus::Waiting,
            radius,
            created_at: now,
            start_time: None,
            end_time: None,
            winner_id: None,
        };
        let runner = Player {
            id: player_id,
            session_id: id,
            owner_id: creator,
            role: Role::Runner,
            position: Point::ORIGIN,
            active: true,
            joined_at: now,
        };

        Ok(Self {
            record,
            players: vec![runner],
        })
    }

    /// Reassembles a session from stored rows, checking its invariants.
    ///
    /// # Errors
    /// [`SessionError::CorruptSession`] if the rows could not have been
    /// produced by this module's operations.
    pub fn from_parts(
        record: SessionRecord,
        players: Vec<Player>,
    ) -> Result<Self, SessionError> {
        let id = record.id;
        let corrupt = |why: &str| SessionError::CorruptSession(id, why.to_string());

        if !record.radius.is_finite() || record.radius <= 0.0 {
            return Err(corrupt("non-positive radius"));
        }
        if players.is_empty() {
            return Err(corrupt("no players"));
        }
        if players.len() > MAX_PLAYERS {
            return Err(corrupt("more than two players"));
        }
        if players.iter().any(|p| p.session_id != id) {
            return Err(corrupt("player belongs to another session"));
        }
        if let [a, b] = players.as_slice() {
            if a.role == b.role {
                return Err(corrupt("both players share a role"));
            }
            if a.owner_id == b.owner_id {
                return Err(corrupt("one owner holds both players"));
            }
        }
        if record.status != SessionStatus::Waiting && players.len() != MAX_PLAYERS {
            return Err(corrupt("started without two players"));
        }
        let finished = record.status == SessionStatus::Finished;
        if finished != record.end_time.is_some() || finished != record.winner_id.is_some() {
            return Err(corrupt("end time and winner disagree with status"));
        }

        Ok(Self { record, players })
    }

    // -- Accessors --------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.record.id
    }

    pub fn status(&self) -> SessionStatus {
        self.record.status
    }

    pub fn radius(&self) -> f64 {
        self.record.radius
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_of(&self, owner: &OwnerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.owner_id == owner)
    }

    pub fn player_with_role(&self, role: Role) -> Option<&Player> {
        self.players.iter().find(|p| p.role == role)
    }

    // -- Operations -------------------------------------------------------

    /// Adds `joiner` as the chaser and starts the game.
    ///
    /// Membership and capacity are checked before status, deliberately
    /// not the status-first order a lobby might expect. A session that is
    /// no longer Waiting always holds two players, so a late or duplicate
    /// join reports the more specific conflict instead of "already
    /// started".
    ///
    /// # Errors
    /// - [`SessionError::AlreadyJoined`]: `joiner` already has a player here
    /// - [`SessionError::SessionFull`]: two players are already seated
    /// - [`SessionError::SessionAlreadyStarted`]: status is not Waiting
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        joiner: OwnerId,
        now: u64,
        rules: &GameRules,
        rng: &mut R,
    ) -> Result<&Player, SessionError> {
        let id = self.id();
        if self.player_of(&joiner).is_some() {
            return Err(SessionError::AlreadyJoined(joiner, id));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(SessionError::SessionFull(id));
        }
        if !self.record.status.is_joinable() {
            return Err(SessionError::SessionAlreadyStarted(id));
        }

        let chaser = Player {
            id: player_id,
            session_id: id,
            owner_id: joiner,
            role: Role::Chaser,
            position: rules.chaser_spawn_point(self.radius(), rng),
            active: true,
            joined_at: now,
        };
        self.players.push(chaser);
        self.transition(SessionStatus::Playing);
        self.record.start_time = Some(now);

        Ok(&self.players[self.players.len() - 1])
    }

    /// Moves the player owned by `actor` toward `requested`.
    ///
    /// The target is first limited by `rules.max_step` (if set), then
    /// clamped to the arena. After the move, if both players are seated
    /// and closer than the capture distance, the game finishes with the
    /// chaser's owner as winner, no matter which of the two moved.
    ///
    /// # Errors
    /// - [`SessionError::InvalidPosition`]: non-finite coordinates
    /// - [`SessionError::SessionNotActive`]: status is not Playing
    /// - [`SessionError::PlayerNotInSession`]: `actor` has no player here
    pub fn move_player(
        &mut self,
        actor: &OwnerId,
        requested: Point,
        now: u64,
        rules: &GameRules,
    ) -> Result<MoveOutcome, SessionError> {
        if !requested.is_finite() {
            return Err(SessionError::InvalidPosition(requested));
        }
        let id = self.id();
        if !self.record.status.is_active() {
            return Err(SessionError::SessionNotActive(id, self.record.status));
        }
        let radius = self.radius();
        let player = self
            .players
            .iter_mut()
            .find(|p| &p.owner_id == actor)
            .ok_or_else(|| SessionError::PlayerNotInSession(actor.clone(), id))?;

        let target = match rules.max_step {
            Some(step) => geometry::step_toward(player.position, requested, step),
            None => requested,
        };
        player.position = geometry::clamp_to_circle(target, radius);
        let player_id = player.id;
        let position = player.position;

        let winner_id = self.check_capture(now, rules);
        Ok(MoveOutcome {
            player_id,
            position,
            winner_id,
        })
    }

    fn transition(&mut self, to: SessionStatus) {
        debug_assert!(
            self.record.status.can_transition_to(to),
            "illegal status change {} -> {}",
            self.record.status,
            to
        );
        self.record.status = to;
    }

    /// Finishes the game if the two players touch. Returns the winner.
    fn check_capture(&mut self, now: u64, rules: &GameRules) -> Option<OwnerId> {
        let [a, b] = self.players.as_slice() else {
            return None;
        };
        if geometry::distance(a.position, b.position) >= rules.capture_distance() {
            return None;
        }
        let winner = self.player_with_role(Role::Chaser)?.owner_id.clone();

        self.transition(SessionStatus::Finished);
        self.record.end_time = Some(now);
        self.record.winner_id = Some(winner.clone());
        Some(winner)
    }

    /// Resets a finished game for another round.
    ///
    /// The runner goes back to the center, the chaser to a fresh spawn
    /// point. Roles are kept: whoever chased last round chases again.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFinished`]: status is not Finished
    /// - [`SessionError::WrongPlayerCount`]: not exactly two players
    pub fn restart<R: Rng + ?Sized>(
        &mut self,
        now: u64,
        rules: &GameRules,
        rng: &mut R,
    ) -> Result<(), SessionError> {
        let id = self.id();
        if self.record.status != SessionStatus::Finished {
            return Err(SessionError::SessionNotFinished(id, self.record.status));
        }
        if self.players.len() != MAX_PLAYERS {
            return Err(SessionError::WrongPlayerCount(id, self.players.len()));
        }

        let radius = self.radius();
        for player in &mut self.players {
            player.position = match player.role {
                Role::Runner => Point::ORIGIN,
                Role::Chaser => rules.chaser_spawn_point(radius, rng),
            };
        }
        self.transition(SessionStatus::Playing);
        self.record.start_time = Some(now);
        self.record.end_time = None;
        self.record.winner_id = None;
        Ok(())
    }

    /// Sets the liveness flag of the player owned by `owner`.
    ///
    /// # Errors
    /// [`SessionError::PlayerNotInSession`] if `owner` has no player here.
    pub fn set_active(
        &mut self,
        owner: &OwnerId,
        active: bool,
    ) -> Result<PlayerId, SessionError> {
        let id = self.id();
        let player = self
            .players
            .iter_mut()
            .find(|p| &p.owner_id == owner)
            .ok_or_else(|| SessionError::PlayerNotInSession(owner.clone(), id))?;
        player.active = active;
        Ok(player.id)
    }

    // -- Views ------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.record.id,
            status: self.record.status,
            radius: self.record.radius,
            created_at: self.record.created_at,
            start_time: self.record.start_time,
            end_time: self.record.end_time,
            winner_id: self.record.winner_id.clone(),
            players: self.players.iter().map(Player::snapshot).collect(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.record.summary()
    }
}

impl SessionRecord {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            status: self.status,
            radius: self.radius,
            created_at: self.created_at,
            winner_id: self.winner_id.clone(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
