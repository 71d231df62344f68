//! Error types for the registry layer.

use tagforge_protocol::SessionId;
use tagforge_session::{ErrorKind, SessionError};

/// Errors raised by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write.
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A session rule refused the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Persisting or loading failed. The in-memory session is unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session's task stopped (evicted or shutting down) before it
    /// could answer.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(e) => e.kind(),
            Self::Store(_) | Self::Unavailable(_) => ErrorKind::Internal,
        }
    }
}
