//! Core vocabulary shared by every Tagforge layer.
//!
//! Everything in this module is plain data: identifiers, arena
//! coordinates, roles, lifecycle states, and the read-only views a
//! transport layer hands to clients. None of it carries behavior beyond
//! small helpers; the rules live in `tagforge-session`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Parses the 1–16 hex digit form produced by the id `Display` impls.
fn parse_hex_id(kind: &'static str, s: &str) -> Result<u64, ProtocolError> {
    let s = s.trim();
    if s.is_empty() || s.len() > 16 {
        return Err(ProtocolError::InvalidId(format!(
            "{kind} id must be 1-16 hex digits, got {s:?}"
        )));
    }
    u64::from_str_radix(s, 16).map_err(|_| {
        ProtocolError::InvalidId(format!("{kind} id is not hex: {s:?}"))
    })
}

/// A unique identifier for a session (one tag match).
///
/// Players share this id out-of-band to invite an opponent, so its
/// textual form matters: it is always rendered as 16 lowercase hex
/// digits and parsed back with [`FromStr`].
///
/// On the wire it travels as that hex *string*, not as a JSON number.
/// A random `u64` does not fit in a JavaScript number without losing
/// precision, and the browser client is the main consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id("session", s).map(Self)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A unique identifier for a player record.
///
/// A player record is one participant's seat in one session. The same
/// person playing two sessions has two `PlayerId`s but one [`OwnerId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id("player", s).map(Self)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// The identity of whoever controls a player: a user account, an
/// anonymous guest, a bot. Opaque to the engine, which only compares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A position in game space. The arena is centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The arena center.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are neither NaN nor infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Distance from the origin.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which side of the chase a player is on. Assigned at join, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Starts at the center; tries not to get caught.
    Runner,
    /// "It". Starts on the boundary; wins by touching the runner.
    /// Older clients call this role `"it"`, which is still accepted.
    #[serde(alias = "it")]
    Chaser,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runner => write!(f, "runner"),
            Self::Chaser => write!(f, "chaser"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Waiting ──(2nd player joins)──→ Playing ──(collision)──→ Finished
///                                    ↑                         │
///                                    └────────(restart)────────┘
/// ```
///
/// `Waiting` is initial. `Finished` is terminal unless explicitly restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

impl SessionStatus {
    /// Returns `true` if a second player may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if players may move.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns `true` if `self → target` is an edge of the state machine.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing)
                | (Self::Playing, Self::Finished)
                | (Self::Finished, Self::Playing)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots — read-only views handed to callers
// ---------------------------------------------------------------------------

/// One player as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub owner_id: OwnerId,
    pub role: Role,
    pub position: Point,
    pub active: bool,
    /// Milliseconds since the Unix epoch.
    pub joined_at: u64,
    /// Filled in by the identity provider on reads. Absent in updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A consistent view of a session and all of its players.
///
/// Produced in one step by the session's owner, so the position of every
/// player always agrees with `status` and `winner_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub status: SessionStatus,
    pub radius: f64,
    pub created_at: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub winner_id: Option<OwnerId>,
    pub players: Vec<PlayerSnapshot>,
}

impl SessionSnapshot {
    /// Looks up the player controlled by `owner`.
    pub fn player_of(&self, owner: &OwnerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| &p.owner_id == owner)
    }

    /// Looks up the player holding `role`.
    pub fn player_with_role(&self, role: Role) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.role == role)
    }
}

/// A lobby-list entry: session metadata without the players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub status: SessionStatus,
    pub radius: f64,
    pub created_at: u64,
    pub winner_id: Option<OwnerId>,
}

// ---------------------------------------------------------------------------
// Updates — what observers of a session receive
// ---------------------------------------------------------------------------

/// Why a session changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateCause {
    /// The second player joined and the game started.
    Joined { player_id: PlayerId },
    /// A player moved and nobody was caught.
    Moved { player_id: PlayerId },
    /// A player moved and the chaser caught the runner.
    Caught { player_id: PlayerId, winner_id: OwnerId },
    /// A finished game was reset for another round.
    Restarted,
    /// A player's liveness flag changed.
    Presence { player_id: PlayerId, active: bool },
}

/// One committed change to a session.
///
/// Exactly one update is published per committed mutation, and it carries
/// the whole post-commit session. An observer therefore never sees a new
/// position without the capture it caused, or the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub session_id: SessionId,
    /// Starts at 0 for a freshly created session and grows by one per commit.
    pub version: u64,
    pub cause: UpdateCause,
    pub session: SessionSnapshot,
}

// =========================================================================
// Tests
// =========================================================================
