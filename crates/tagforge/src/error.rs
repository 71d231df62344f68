//! Unified error type for Tagforge.

use tagforge_protocol::ProtocolError;
use tagforge_registry::RegistryError;
use tagforge_session::{ErrorKind, SessionError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tagforge` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TagforgeError {
    /// Encoding, decoding, or a malformed id.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session rule refused the operation, the store failed, or the
    /// session's task was gone.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TagforgeError {
    /// The broad category, for mapping onto transport status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(ProtocolError::InvalidId(_)) => ErrorKind::InvalidInput,
            Self::Protocol(_) => ErrorKind::Internal,
            Self::Registry(e) => e.kind(),
        }
    }

    /// The rule violation behind this error, if it was one.
    pub fn session_error(&self) -> Option<&SessionError> {
        match self {
            Self::Registry(RegistryError::Session(e)) => Some(e),
            _ => None,
        }
    }
}
