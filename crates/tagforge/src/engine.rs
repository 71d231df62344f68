//! `SessionEngine` builder and public operations.
//!
//! This is the entry point for hosting tag matches. It ties together the
//! layers: protocol types → session rules → live registry, and adds the
//! identity lookup that read views need.

use tagforge_protocol::{
    OwnerId, PlayerId, Point, SessionId, SessionSnapshot, SessionSummary, SessionUpdate,
};
use tagforge_registry::{MemoryStore, RegistryConfig, SessionRegistry, SessionStore};
use tagforge_session::{Clock, GameRules, IdentityProvider, NoIdentities, SystemClock};
use tokio::sync::broadcast;

use crate::TagforgeError;

/// How many sessions the lobby's "recent games" list shows.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Builder for configuring a [`SessionEngine`].
///
/// # Example
///
/// ```rust
/// use tagforge::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), TagforgeError> {
/// let engine = SessionEngine::builder()
///     .rules(GameRules::default())
///     .build(MemoryStore::new(), NoIdentities, SystemClock);
///
/// let (session_id, _) = engine.create_session(250.0, OwnerId::new("alice")).await?;
/// engine.join_session(session_id, OwnerId::new("bob")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionEngineBuilder {
    rules: GameRules,
    config: RegistryConfig,
}

impl SessionEngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gameplay rules.
    pub fn rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the registry configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine around its three collaborators.
    ///
    /// Out-of-range rule or config values are replaced with defaults and
    /// logged, not rejected.
    pub fn build<S, I, C>(self, store: S, identities: I, clock: C) -> SessionEngine<S, I, C>
    where
        S: SessionStore,
        I: IdentityProvider,
        C: Clock,
    {
        let seeded = self.config.rng_seed.is_some();
        let registry = SessionRegistry::new(store, clock, self.rules, self.config);
        let rules = registry.rules();
        tracing::info!(
            player_radius = rules.player_radius,
            max_step = ?rules.max_step,
            seeded,
            "session engine ready"
        );
        SessionEngine { registry, identities }
    }
}

/// Hosts any number of concurrent tag sessions.
///
/// All methods take `&self` and may be called from many tasks at once;
/// share the engine with an `Arc`. Operations on one session are applied
/// in arrival order, and operations on different sessions run in parallel.
///
/// The type parameters default to the in-process collaborators; the
/// builder picks the real ones from what is passed to `build`.
pub struct SessionEngine<
    S: SessionStore = MemoryStore,
    I: IdentityProvider = NoIdentities,
    C: Clock = SystemClock,
> {
    registry: SessionRegistry<S, C>,
    identities: I,
}

impl SessionEngine {
    /// Creates a new builder.
    pub fn builder() -> SessionEngineBuilder {
        SessionEngineBuilder::new()
    }
}

impl<S, I, C> SessionEngine<S, I, C>
where
    S: SessionStore,
    I: IdentityProvider,
    C: Clock,
{
    pub fn registry(&self) -> &SessionRegistry<S, C> {
        &self.registry
    }

    pub fn identities(&self) -> &I {
        &self.identities
    }

    /// Opens a new session in an arena of `radius` with `creator` as the
    /// runner at the center.
    ///
    /// Returns the session id (to share with an opponent) and the
    /// creator's player id.
    pub async fn create_session(
        &self,
        radius: f64,
        creator: OwnerId,
    ) -> Result<(SessionId, PlayerId), TagforgeError> {
        Ok(self.registry.create(radius, creator).await?)
    }

    /// Seats `joiner` as the chaser and starts the game.
    pub async fn join_session(
        &self,
        session_id: SessionId,
        joiner: OwnerId,
    ) -> Result<PlayerId, TagforgeError> {
        Ok(self.registry.join(session_id, joiner).await?.id)
    }

    /// Moves `actor`'s player toward `to` and returns where it ended up
    /// after clamping. May finish the game.
    pub async fn move_player(
        &self,
        session_id: SessionId,
        actor: OwnerId,
        to: Point,
    ) -> Result<Point, TagforgeError> {
        let outcome = self.registry.move_player(session_id, actor, to).await?;
        Ok(outcome.position)
    }

    /// Starts another round of a finished session with the same roles.
    pub async fn restart_session(&self, session_id: SessionId) -> Result<SessionId, TagforgeError> {
        self.registry.restart(session_id).await?;
        Ok(session_id)
    }

    /// A consistent view of the session, with display names filled in.
    ///
    /// Never changes the session.
    pub async fn get_session(
        &self,
        session_id: SessionId,
    ) -> Result<SessionSnapshot, TagforgeError> {
        let mut snapshot = self.registry.snapshot(session_id).await?;
        for player in &mut snapshot.players {
            player.display_name = self.identities.display_name(&player.owner_id).await;
        }
        Ok(snapshot)
    }

    /// Marks `owner`'s player as connected or disconnected. The game
    /// itself is unaffected.
    pub async fn set_player_active(
        &self,
        session_id: SessionId,
        owner: OwnerId,
        active: bool,
    ) -> Result<(), TagforgeError> {
        self.registry.set_active(session_id, owner, active).await?;
        Ok(())
    }

    /// Receives one [`SessionUpdate`] per change committed after this call.
    ///
    /// A receiver that falls more than the configured buffer behind gets
    /// `RecvError::Lagged` and skips ahead; every update it does receive
    /// is a complete post-commit state.
    pub async fn subscribe(
        &self,
        session_id: SessionId,
    ) -> Result<broadcast::Receiver<SessionUpdate>, TagforgeError> {
        Ok(self.registry.subscribe(session_id).await?)
    }

    /// Up to `limit` sessions, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<SessionSummary>, TagforgeError> {
        Ok(self.registry.list_recent(limit).await?)
    }

    /// Every session `owner` has a player in.
    pub async fn sessions_for(&self, owner: &OwnerId) -> Result<Vec<SessionId>, TagforgeError> {
        Ok(self.registry.sessions_for(owner).await?)
    }

    /// Unloads a session from memory. It is reloaded from the store on
    /// next use. Returns `false` if it was not loaded.
    pub async fn evict(&self, session_id: SessionId) -> bool {
        self.registry.evict(session_id).await
    }
}
