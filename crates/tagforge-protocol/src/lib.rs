//! Shared vocabulary for Tagforge.
//!
//! This crate defines the data every other layer speaks:
//!
//! - **Identity** ([`SessionId`], [`PlayerId`], [`OwnerId`])
//! - **Arena** ([`Point`], [`Role`], [`SessionStatus`])
//! - **Views** ([`SessionSnapshot`], [`PlayerSnapshot`], [`SessionSummary`])
//! - **Updates** ([`SessionUpdate`], [`UpdateCause`]) — what observers of
//!   a session receive after each committed change
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how a transport turns
//!   the above into bytes
//!
//! ```text
//! Transport (bytes) → Protocol (snapshots/updates) → Session (rules)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    OwnerId, PlayerId, PlayerSnapshot, Point, Role, SessionId,
    SessionSnapshot, SessionStatus, SessionSummary, SessionUpdate,
    UpdateCause,
};
