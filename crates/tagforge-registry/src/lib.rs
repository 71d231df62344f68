//! Live session management for Tagforge.
//!
//! Each live session runs as an isolated Tokio task (actor model) that
//! owns its state and applies operations one at a time. Every change is
//! written through to a [`SessionStore`] before it becomes visible.
//!
//! # Key types
//!
//! - [`SessionRegistry`] — creates sessions, finds or reloads them, evicts them
//! - [`SessionHandle`] — send commands to a running session actor
//! - [`SessionStore`] — persistence seam; [`MemoryStore`] is the in-process one
//! - [`RegistryConfig`] — channel sizes and RNG seeding

mod actor;
mod config;
mod error;
mod registry;
mod store;

pub use actor::SessionHandle;
pub use config::RegistryConfig;
pub use error::{RegistryError, StoreError};
pub use registry::SessionRegistry;
pub use store::{MemoryStore, SessionStore};
