//! # Tagforge
//!
//! Server-authoritative session engine for a two-player tag game in a
//! circular arena.
//!
//! One player (the runner) starts at the center, the other (the chaser)
//! on the boundary. Clients send the positions they want; the engine
//! clamps them to the arena, detects when the chaser touches the runner,
//! and records the winner. Finished sessions can be restarted with the
//! same roles.
//!
//! ## Layers
//!
//! ```text
//! tagforge           ← SessionEngine: public operations, display names
//! tagforge-registry  ← one actor per live session, write-through store
//! tagforge-session   ← Session state machine, GameRules, geometry
//! tagforge-protocol  ← ids, Point, snapshots, updates, JSON codec
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagforge::prelude::*;
//!
//! # async fn demo() -> Result<(), TagforgeError> {
//! let engine = SessionEngine::builder()
//!     .build(MemoryStore::new(), NoIdentities, SystemClock);
//!
//! let (id, _) = engine.create_session(250.0, OwnerId::new("alice")).await?;
//! engine.join_session(id, OwnerId::new("bob")).await?;
//! let at = engine.move_player(id, OwnerId::new("alice"), Point::new(260.0, 0.0)).await?;
//! assert_eq!(at, Point::new(250.0, 0.0));
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;

pub use engine::{DEFAULT_RECENT_LIMIT, SessionEngine, SessionEngineBuilder};
pub use error::TagforgeError;

/// Everything needed to host sessions, in one import.
pub mod prelude {
    pub use crate::{DEFAULT_RECENT_LIMIT, SessionEngine, SessionEngineBuilder, TagforgeError};
    pub use tagforge_protocol::{
        Codec, JsonCodec, OwnerId, PlayerId, PlayerSnapshot, Point, ProtocolError, Role, SessionId,
        SessionSnapshot, SessionStatus, SessionSummary, SessionUpdate, UpdateCause,
    };
    pub use tagforge_registry::{
        MemoryStore, RegistryConfig, RegistryError, SessionRegistry, SessionStore, StoreError,
    };
    pub use tagforge_session::{
        AnonymousIdentities, Clock, ErrorKind, GameRules, IdentityProvider, ManualClock,
        NoIdentities, SessionError, SpawnPolicy, SystemClock,
    };
}
