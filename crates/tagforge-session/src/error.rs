//! Error types for the session layer.

use std::fmt;

use tagforge_protocol::{OwnerId, Point, SessionId, SessionStatus};

/// The broad category of a failure.
///
/// Transport layers map this to a status code (404, 409, 400, …) without
/// matching on every error variant. Every error type in Tagforge exposes
/// a `kind()` that returns one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session or player does not exist.
    NotFound,
    /// The operation is not allowed in the session's current status.
    InvalidState,
    /// The operation collides with existing membership or capacity.
    Conflict,
    /// The caller supplied a malformed argument.
    InvalidInput,
    /// Storage or runtime failure unrelated to the request itself.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidState => write!(f, "invalid_state"),
            Self::Conflict => write!(f, "conflict"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Errors produced by session rules.
///
/// None of these are retried internally and none are fatal: each one
/// fails exactly the operation that produced it and leaves the session
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session already has its two players and has started.
    #[error("session {0} has already started")]
    SessionAlreadyStarted(SessionId),

    #[error("{0} already joined session {1}")]
    AlreadyJoined(OwnerId, SessionId),

    #[error("session {0} is full")]
    SessionFull(SessionId),

    /// Moves are only accepted while the session is Playing.
    #[error("session {0} is not active (status: {1})")]
    SessionNotActive(SessionId, SessionStatus),

    #[error("{0} has no player in session {1}")]
    PlayerNotInSession(OwnerId, SessionId),

    /// Restart is only accepted once the session is Finished.
    #[error("session {0} is not finished (status: {1})")]
    SessionNotFinished(SessionId, SessionStatus),

    #[error("session {0} needs exactly 2 players, has {1}")]
    WrongPlayerCount(SessionId, usize),

    #[error("arena radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    /// NaN or infinite coordinates. Rejected before any clamping so they
    /// never reach stored state.
    #[error("position must have finite coordinates, got {0}")]
    InvalidPosition(Point),

    /// Stored records that violate the session invariants.
    #[error("session {0} is corrupt: {1}")]
    CorruptSession(SessionId, String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::PlayerNotInSession(..) => {
                ErrorKind::NotFound
            }
            Self::SessionAlreadyStarted(_)
            | Self::SessionNotActive(..)
            | Self::SessionNotFinished(..) => ErrorKind::InvalidState,
            Self::AlreadyJoined(..)
            | Self::SessionFull(_)
            | Self::WrongPlayerCount(..) => ErrorKind::Conflict,
            Self::InvalidRadius(_) | Self::InvalidPosition(_) => {
                ErrorKind::InvalidInput
            }
            Self::CorruptSession(..) => ErrorKind::Internal,
        }
    }
}
