//! Session rules for Tagforge.
//!
//! This crate holds everything that decides what a tag match *is*,
//! independent of how sessions are stored or shared between tasks:
//!
//! 1. **Geometry** — clamping to the arena, spawn points, distances
//! 2. **Rules** — [`GameRules`]: collision size, spawn policy, speed clamp
//! 3. **The session entity** — [`Session`]: create, join, move, restart
//! 4. **Hooks** — [`IdentityProvider`] for display names, [`Clock`] for time
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (tagforge)             ← public API, enriches snapshots with names
//!     ↕
//! Registry (tagforge-registry)  ← one task per live session, persistence
//!     ↕
//! Session Layer (this crate)    ← the state machine and its invariants
//!     ↕
//! Protocol Layer (below)        ← ids, Point, snapshots, updates
//! ```

#![allow(async_fn_in_trait)]

mod clock;
mod config;
mod error;
pub mod geometry;
mod identity;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GameRules, SpawnPolicy};
pub use error::{ErrorKind, SessionError};
pub use identity::{AnonymousIdentities, IdentityProvider, NoIdentities};
pub use session::{MAX_PLAYERS, MoveOutcome, Player, Session, SessionRecord};
